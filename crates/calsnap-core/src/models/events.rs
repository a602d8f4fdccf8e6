//! Event bus envelopes and the typed details carried between stages.
//!
//! The bus delivers JSON envelopes keyed by `source` and `detail-type`.
//! [`PipelineEvent`] performs the same routing the bus rules do and rejects
//! anything it cannot route or that fails validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    OBJECT_CREATED_DETAIL_TYPE, OBJECT_STORE_SOURCE, OCR_COMPLETED_DETAIL_TYPE, OCR_SOURCE,
};
use crate::error::{AppError, AppResult};

/// Bus envelope around a typed detail payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<D> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    #[serde(rename = "detail-type", alias = "detail_type", alias = "DetailType")]
    pub detail_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    pub detail: D,
}

impl<D> EventEnvelope<D> {
    pub fn new(source: impl Into<String>, detail_type: impl Into<String>, detail: D) -> Self {
        Self {
            id: None,
            source: source.into(),
            detail_type: detail_type.into(),
            time: None,
            region: None,
            resources: Vec::new(),
            detail,
        }
    }
}

impl<D: Serialize> EventEnvelope<D> {
    /// Same envelope with the detail rendered as untyped JSON, the form
    /// publishers put on the wire.
    pub fn to_json_detail(&self) -> serde_json::Result<EventEnvelope<serde_json::Value>> {
        Ok(EventEnvelope {
            id: self.id.clone(),
            source: self.source.clone(),
            detail_type: self.detail_type.clone(),
            time: self.time,
            region: self.region.clone(),
            resources: self.resources.clone(),
            detail: serde_json::to_value(&self.detail)?,
        })
    }
}

/// Routing header shared by all envelopes; everything else is ignored.
#[derive(Debug, Deserialize)]
struct EventHead {
    source: String,
    #[serde(rename = "detail-type", alias = "detail_type", alias = "DetailType")]
    detail_type: String,
}

/// Bucket and key of one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
}

impl StoredObject {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.bucket.is_empty() && !self.key.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectKey {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// Detail of an object-store "Object Created" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCreatedDetail {
    pub bucket: BucketName,
    pub object: ObjectKey,
}

impl ObjectCreatedDetail {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: BucketName { name: bucket.into() },
            object: ObjectKey {
                key: key.into(),
                size: None,
                etag: None,
            },
        }
    }

    pub fn stored_object(&self) -> StoredObject {
        StoredObject::new(self.bucket.name.clone(), self.object.key.clone())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.bucket.name.trim().is_empty() {
            return Err(AppError::InvalidEvent(
                "object-created event has an empty bucket name".to_string(),
            ));
        }
        if self.object.key.trim().is_empty() {
            return Err(AppError::InvalidEvent(
                "object-created event has an empty object key".to_string(),
            ));
        }
        Ok(())
    }
}

/// Detail of an `OCRCompleted` event.
///
/// The orchestrator always fills `calories`; it is optional here so that the
/// notifier can treat a payload without it as a no-op rather than a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrCompleted {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub calories: Option<f64>,
}

impl OcrCompleted {
    pub fn new(object: &StoredObject, text: impl Into<String>, calories: f64) -> Self {
        Self {
            bucket: object.bucket.clone(),
            key: object.key.clone(),
            text: text.into(),
            calories: Some(calories),
        }
    }

    pub fn into_envelope(self) -> EventEnvelope<OcrCompleted> {
        EventEnvelope::new(OCR_SOURCE, OCR_COMPLETED_DETAIL_TYPE, self)
    }
}

/// An inbound bus event this pipeline knows how to handle.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    ObjectCreated(EventEnvelope<ObjectCreatedDetail>),
    OcrCompleted(EventEnvelope<OcrCompleted>),
}

impl PipelineEvent {
    pub fn from_json(raw: &str) -> AppResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    /// Route a raw envelope by `(source, detail-type)` and validate its detail.
    pub fn from_value(value: serde_json::Value) -> AppResult<Self> {
        let head: EventHead = serde_json::from_value(value.clone())?;

        match (head.source.as_str(), head.detail_type.as_str()) {
            (OBJECT_STORE_SOURCE, OBJECT_CREATED_DETAIL_TYPE) => {
                let envelope: EventEnvelope<ObjectCreatedDetail> = serde_json::from_value(value)?;
                envelope.detail.validate()?;
                Ok(PipelineEvent::ObjectCreated(envelope))
            }
            (OCR_SOURCE, OCR_COMPLETED_DETAIL_TYPE) => {
                let envelope: EventEnvelope<OcrCompleted> = serde_json::from_value(value)?;
                Ok(PipelineEvent::OcrCompleted(envelope))
            }
            (source, detail_type) => Err(AppError::InvalidEvent(format!(
                "no route for source={} detail-type={}",
                source, detail_type
            ))),
        }
    }

    pub fn detail_type(&self) -> &str {
        match self {
            PipelineEvent::ObjectCreated(envelope) => &envelope.detail_type,
            PipelineEvent::OcrCompleted(envelope) => &envelope.detail_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn routes_object_created_event() {
        let raw = json!({
            "version": "0",
            "id": "17793124-05d4-b198-2fde-7ededc63b103",
            "detail-type": "Object Created",
            "source": "aws.s3",
            "account": "123456789012",
            "time": "2025-05-01T12:00:00Z",
            "region": "ap-northeast-1",
            "resources": ["arn:aws:s3:::meal-photos"],
            "detail": {
                "version": "0",
                "bucket": {"name": "meal-photos"},
                "object": {"key": "123_456.jpg", "size": 5, "etag": "b1946ac92492d2347c6235b4d2611184"},
                "reason": "PutObject"
            }
        });

        match PipelineEvent::from_value(raw).unwrap() {
            PipelineEvent::ObjectCreated(envelope) => {
                assert_eq!(
                    envelope.detail.stored_object(),
                    StoredObject::new("meal-photos", "123_456.jpg")
                );
                assert_eq!(envelope.detail.object.size, Some(5));
                assert_eq!(envelope.resources.len(), 1);
            }
            other => panic!("unexpected route: {:?}", other),
        }
    }

    #[test]
    fn accepts_underscore_detail_type() {
        let raw = r#"{"source":"custom.ocr","detail_type":"OCRCompleted","detail":{"calories":350}}"#;
        match PipelineEvent::from_json(raw).unwrap() {
            PipelineEvent::OcrCompleted(envelope) => {
                assert_eq!(envelope.detail.calories, Some(350.0));
                assert!(envelope.detail.bucket.is_empty());
            }
            other => panic!("unexpected route: {:?}", other),
        }
    }

    #[test]
    fn completion_without_calories_still_parses() {
        let raw = json!({
            "source": "custom.ocr",
            "detail-type": "OCRCompleted",
            "detail": {"bucket": "b", "key": "k.jpg", "text": "hello"}
        });
        match PipelineEvent::from_value(raw).unwrap() {
            PipelineEvent::OcrCompleted(envelope) => assert_eq!(envelope.detail.calories, None),
            other => panic!("unexpected route: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_route() {
        let raw = json!({"source": "aws.s3", "detail-type": "Object Deleted", "detail": {}});
        let err = PipelineEvent::from_value(raw).unwrap_err();
        assert!(matches!(err, AppError::InvalidEvent(_)));
        assert!(err.to_string().contains("Object Deleted"));
    }

    #[test]
    fn rejects_object_created_without_key() {
        let raw = json!({
            "source": "aws.s3",
            "detail-type": "Object Created",
            "detail": {"bucket": {"name": "meal-photos"}, "object": {"key": ""}}
        });
        assert!(matches!(
            PipelineEvent::from_value(raw),
            Err(AppError::InvalidEvent(_))
        ));

        let raw = json!({
            "source": "aws.s3",
            "detail-type": "Object Created",
            "detail": {"bucket": {"name": "meal-photos"}}
        });
        assert!(matches!(
            PipelineEvent::from_value(raw),
            Err(AppError::InvalidEvent(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_calories() {
        let raw = json!({
            "source": "custom.ocr",
            "detail-type": "OCRCompleted",
            "detail": {"calories": "lots"}
        });
        assert!(PipelineEvent::from_value(raw).is_err());
    }

    #[test]
    fn completion_envelope_uses_bus_field_names() {
        let object = StoredObject::new("meal-photos", "1_2.jpg");
        let envelope = OcrCompleted::new(&object, "推定消費カロリー 420kcal", 420.0).into_envelope();
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(value["source"], "custom.ocr");
        assert_eq!(value["detail-type"], "OCRCompleted");
        assert_eq!(value["detail"]["bucket"], "meal-photos");
        assert_eq!(value["detail"]["key"], "1_2.jpg");
        assert_eq!(value["detail"]["calories"], 420.0);
        assert!(value.get("id").is_none());
    }
}
