//! Event bus publishing.

use anyhow::Result;
use async_trait::async_trait;
use calsnap_core::EventEnvelope;

/// Puts events on the bus that routes them to downstream stages.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &EventEnvelope<serde_json::Value>) -> Result<()>;
}

#[cfg(feature = "bus-eventbridge")]
pub use eventbridge::EventBridgePublisher;

#[cfg(feature = "bus-eventbridge")]
mod eventbridge {
    use super::*;
    use anyhow::Context;
    use aws_config::BehaviorVersion;
    use aws_sdk_eventbridge::error::DisplayErrorContext;
    use aws_sdk_eventbridge::types::PutEventsRequestEntry;
    use aws_sdk_eventbridge::Client;

    /// EventBridge `PutEvents` publisher bound to one bus.
    #[derive(Clone)]
    pub struct EventBridgePublisher {
        client: Client,
        event_bus_name: String,
    }

    impl EventBridgePublisher {
        pub async fn new(event_bus_name: impl Into<String>, region: Option<String>) -> Self {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(aws_config::Region::new(region));
            }
            let config = loader.load().await;
            Self::from_client(Client::new(&config), event_bus_name)
        }

        pub fn from_client(client: Client, event_bus_name: impl Into<String>) -> Self {
            Self {
                client,
                event_bus_name: event_bus_name.into(),
            }
        }

        fn build_entry(
            &self,
            event: &EventEnvelope<serde_json::Value>,
        ) -> Result<PutEventsRequestEntry> {
            let detail =
                serde_json::to_string(&event.detail).context("Failed to serialize event detail")?;

            let mut entry = PutEventsRequestEntry::builder()
                .source(&event.source)
                .detail_type(&event.detail_type)
                .detail(detail)
                .event_bus_name(&self.event_bus_name);
            for resource in &event.resources {
                entry = entry.resources(resource);
            }
            Ok(entry.build())
        }
    }

    #[async_trait]
    impl EventPublisher for EventBridgePublisher {
        async fn publish(&self, event: &EventEnvelope<serde_json::Value>) -> Result<()> {
            let entry = self.build_entry(event)?;

            let output = self
                .client
                .put_events()
                .entries(entry)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("{}", DisplayErrorContext(&e)))
                .context("Failed to put event on EventBridge")?;

            if output.failed_entry_count() > 0 {
                let reason = output
                    .entries()
                    .iter()
                    .find_map(|entry| {
                        entry.error_code().map(|code| {
                            format!("{}: {}", code, entry.error_message().unwrap_or_default())
                        })
                    })
                    .unwrap_or_else(|| "unknown error".to_string());
                return Err(anyhow::anyhow!(
                    "EventBridge rejected {} event: {}",
                    event.detail_type,
                    reason
                ));
            }

            let event_id = output
                .entries()
                .first()
                .and_then(|entry| entry.event_id())
                .unwrap_or_default();

            tracing::info!(
                event_bus = %self.event_bus_name,
                source = %event.source,
                detail_type = %event.detail_type,
                event_id = %event_id,
                "Published event"
            );

            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        fn publisher() -> EventBridgePublisher {
            let config = aws_sdk_eventbridge::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(aws_sdk_eventbridge::config::Region::new("ap-northeast-1"))
                .build();
            EventBridgePublisher::from_client(Client::from_conf(config), "default")
        }

        #[test]
        fn entry_carries_routing_fields_and_json_detail() {
            let event = EventEnvelope::new(
                "custom.ocr",
                "OCRCompleted",
                json!({"bucket": "meal-photos", "key": "1_2.jpg", "text": "t", "calories": 420.0}),
            );

            let entry = publisher().build_entry(&event).unwrap();
            assert_eq!(entry.source(), Some("custom.ocr"));
            assert_eq!(entry.detail_type(), Some("OCRCompleted"));
            assert_eq!(entry.event_bus_name(), Some("default"));

            let detail: serde_json::Value =
                serde_json::from_str(entry.detail().unwrap()).unwrap();
            assert_eq!(detail["calories"], 420.0);
            assert_eq!(detail["key"], "1_2.jpg");
        }

        #[test]
        fn entry_forwards_resources() {
            let mut event = EventEnvelope::new("custom.ocr", "OCRCompleted", json!({}));
            event.resources = vec!["arn:aws:s3:::meal-photos/1_2.jpg".to_string()];

            let entry = publisher().build_entry(&event).unwrap();
            assert_eq!(
                entry.resources().to_vec(),
                vec!["arn:aws:s3:::meal-photos/1_2.jpg".to_string()]
            );
        }
    }
}
