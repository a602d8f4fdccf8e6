//! Configuration module
//!
//! Configuration is read once from the environment at process start and is
//! immutable afterwards. Handlers receive the values they need through their
//! constructors; nothing reads the environment after [`Config::from_env`].

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::PRESIGNED_URL_TTL_SECS;

const FB_GRAPH_BASE_URL: &str = "https://graph.facebook.com";
const FB_GRAPH_VERSION: &str = "v22.0";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-4.1-mini";
const EVENT_BUS_NAME: &str = "default";
const POLL_INTERVAL_SECS: u64 = 300;
const HTTP_TIMEOUT_SECS: u64 = 120;
const SMTP_PORT: u16 = 587;

/// Pipeline stage a process is about to run; validation is per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetcher,
    Orchestrator,
    Notifier,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetcher => write!(f, "fetcher"),
            Stage::Orchestrator => write!(f, "orchestrator"),
            Stage::Notifier => write!(f, "notifier"),
        }
    }
}

/// Transport used by the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyBackend {
    /// Publish to a pre-subscribed SNS topic.
    Sns,
    /// Send a plain-text mail directly over SMTP.
    Smtp,
}

impl FromStr for NotifyBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sns" => Ok(NotifyBackend::Sns),
            "smtp" | "email" => Ok(NotifyBackend::Smtp),
            other => Err(anyhow::anyhow!(
                "NOTIFY_BACKEND must be 'sns' or 'smtp', got '{}'",
                other
            )),
        }
    }
}

/// Every setting the pipeline reads from the environment.
#[derive(Clone)]
pub struct PipelineConfig {
    pub environment: String,
    // Feed
    pub fb_access_token: Option<String>,
    pub fb_graph_base_url: String,
    pub fb_graph_version: String,
    // Vision service
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    // Storage
    pub bucket_name: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // S3-compatible providers (MinIO etc.)
    pub aws_region: Option<String>,
    pub presigned_url_ttl_secs: u64,
    // Event bus
    pub event_bus_name: String,
    // Notification
    pub notify_backend: NotifyBackend,
    pub topic_arn: Option<String>,
    pub recipient_email: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_tls: bool,
    // Scheduling / transport
    pub poll_interval_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for PipelineConfig {
    /// Built-in defaults with nothing optional set.
    fn default() -> Self {
        PipelineConfig {
            environment: "development".to_string(),
            fb_access_token: None,
            fb_graph_base_url: FB_GRAPH_BASE_URL.to_string(),
            fb_graph_version: FB_GRAPH_VERSION.to_string(),
            openai_api_key: None,
            openai_base_url: OPENAI_BASE_URL.to_string(),
            openai_model: OPENAI_MODEL.to_string(),
            bucket_name: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            presigned_url_ttl_secs: PRESIGNED_URL_TTL_SECS,
            event_bus_name: EVENT_BUS_NAME.to_string(),
            notify_backend: NotifyBackend::Sns,
            topic_arn: None,
            recipient_email: None,
            smtp_host: None,
            smtp_port: SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            smtp_tls: true,
            poll_interval_secs: POLL_INTERVAL_SECS,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let notify_backend = match non_empty("NOTIFY_BACKEND") {
            Some(raw) => raw.parse()?,
            None => NotifyBackend::Sns,
        };

        Ok(PipelineConfig {
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
            fb_access_token: non_empty("FB_ACCESS_TOKEN"),
            fb_graph_base_url: non_empty("FB_GRAPH_BASE_URL")
                .unwrap_or_else(|| FB_GRAPH_BASE_URL.to_string()),
            fb_graph_version: non_empty("FB_GRAPH_VERSION")
                .unwrap_or_else(|| FB_GRAPH_VERSION.to_string()),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            openai_model: non_empty("OPENAI_MODEL").unwrap_or_else(|| OPENAI_MODEL.to_string()),
            bucket_name: non_empty("BUCKET_NAME").or_else(|| non_empty("S3_BUCKET")),
            s3_region: non_empty("S3_REGION"),
            s3_endpoint: non_empty("S3_ENDPOINT"),
            aws_region: non_empty("AWS_REGION"),
            presigned_url_ttl_secs: parse_or("PRESIGNED_URL_TTL_SECS", PRESIGNED_URL_TTL_SECS)?,
            event_bus_name: non_empty("EVENT_BUS_NAME")
                .unwrap_or_else(|| EVENT_BUS_NAME.to_string()),
            notify_backend,
            topic_arn: non_empty("TOPIC_ARN"),
            recipient_email: non_empty("RECIPIENT_EMAIL"),
            smtp_host: non_empty("SMTP_HOST"),
            smtp_port: parse_or("SMTP_PORT", SMTP_PORT)?,
            smtp_user: non_empty("SMTP_USER"),
            smtp_password: non_empty("SMTP_PASSWORD"),
            smtp_from: non_empty("SMTP_FROM"),
            smtp_tls: parse_or("SMTP_TLS", true)?,
            poll_interval_secs: parse_or("POLL_INTERVAL_SECS", POLL_INTERVAL_SECS)?,
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?,
        })
    }

    /// Check that everything `stage` needs is present and usable.
    pub fn validate_for(&self, stage: Stage) -> Result<(), anyhow::Error> {
        if self.http_timeout_secs == 0 {
            return Err(anyhow::anyhow!("HTTP_TIMEOUT_SECS must be greater than 0"));
        }

        match stage {
            Stage::Fetcher => {
                require(&self.fb_access_token, "FB_ACCESS_TOKEN", stage)?;
                require(&self.bucket_name, "BUCKET_NAME", stage)?;
                if self.poll_interval_secs == 0 {
                    return Err(anyhow::anyhow!("POLL_INTERVAL_SECS must be greater than 0"));
                }
            }
            Stage::Orchestrator => {
                require(&self.openai_api_key, "OPENAI_API_KEY", stage)?;
                require(&self.bucket_name, "BUCKET_NAME", stage)?;
                // Presigned S3 URLs cannot outlive seven days.
                if self.presigned_url_ttl_secs == 0 || self.presigned_url_ttl_secs > 604_800 {
                    return Err(anyhow::anyhow!(
                        "PRESIGNED_URL_TTL_SECS must be between 1 and 604800"
                    ));
                }
            }
            Stage::Notifier => match self.notify_backend {
                NotifyBackend::Sns => {
                    require(&self.topic_arn, "TOPIC_ARN", stage)?;
                }
                NotifyBackend::Smtp => {
                    require(&self.recipient_email, "RECIPIENT_EMAIL", stage)?;
                    require(&self.smtp_host, "SMTP_HOST", stage)?;
                    require(&self.smtp_from, "SMTP_FROM", stage)?;
                }
            },
        }

        Ok(())
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("environment", &self.environment)
            .field("fb_access_token", &redact(&self.fb_access_token))
            .field("fb_graph_base_url", &self.fb_graph_base_url)
            .field("fb_graph_version", &self.fb_graph_version)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("bucket_name", &self.bucket_name)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("aws_region", &self.aws_region)
            .field("presigned_url_ttl_secs", &self.presigned_url_ttl_secs)
            .field("event_bus_name", &self.event_bus_name)
            .field("notify_backend", &self.notify_backend)
            .field("topic_arn", &self.topic_arn)
            .field("recipient_email", &self.recipient_email)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &redact(&self.smtp_password))
            .field("smtp_from", &self.smtp_from)
            .field("smtp_tls", &self.smtp_tls)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<PipelineConfig>);

impl Config {
    fn as_pipeline(&self) -> &PipelineConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = PipelineConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate_for(&self, stage: Stage) -> Result<(), anyhow::Error> {
        self.as_pipeline().validate_for(stage)
    }

    // Convenience getters for common fields
    pub fn environment(&self) -> &str {
        &self.as_pipeline().environment
    }

    pub fn fb_access_token(&self) -> Option<&str> {
        self.as_pipeline().fb_access_token.as_deref()
    }

    pub fn fb_graph_base_url(&self) -> &str {
        &self.as_pipeline().fb_graph_base_url
    }

    pub fn fb_graph_version(&self) -> &str {
        &self.as_pipeline().fb_graph_version
    }

    pub fn openai_api_key(&self) -> Option<&str> {
        self.as_pipeline().openai_api_key.as_deref()
    }

    pub fn openai_base_url(&self) -> &str {
        &self.as_pipeline().openai_base_url
    }

    pub fn openai_model(&self) -> &str {
        &self.as_pipeline().openai_model
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.as_pipeline().bucket_name.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_pipeline().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_pipeline().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_pipeline().aws_region.as_deref()
    }

    /// Explicit object-store region: `S3_REGION`, then `AWS_REGION`.
    ///
    /// `None` leaves resolution to the SDK default chain, so no stage requires
    /// a region in its own config.
    pub fn region(&self) -> Option<&str> {
        self.s3_region().or_else(|| self.aws_region())
    }

    pub fn presigned_url_ttl(&self) -> Duration {
        Duration::from_secs(self.as_pipeline().presigned_url_ttl_secs)
    }

    pub fn event_bus_name(&self) -> &str {
        &self.as_pipeline().event_bus_name
    }

    pub fn notify_backend(&self) -> NotifyBackend {
        self.as_pipeline().notify_backend
    }

    pub fn topic_arn(&self) -> Option<&str> {
        self.as_pipeline().topic_arn.as_deref()
    }

    pub fn recipient_email(&self) -> Option<&str> {
        self.as_pipeline().recipient_email.as_deref()
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.as_pipeline().smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> u16 {
        self.as_pipeline().smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.as_pipeline().smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.as_pipeline().smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.as_pipeline().smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.as_pipeline().smtp_tls
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.as_pipeline().poll_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.as_pipeline().http_timeout_secs)
    }
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
{
    match non_empty(name) {
        Some(raw) => raw
            .to_lowercase()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", name, raw)),
        None => Ok(default),
    }
}

fn require(value: &Option<String>, name: &str, stage: Stage) -> Result<(), anyhow::Error> {
    if value.is_none() {
        return Err(anyhow::anyhow!("{} must be set to run the {}", name, stage));
    }
    Ok(())
}

fn redact(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "***",
        None => "<unset>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PipelineConfig {
        PipelineConfig {
            environment: "test".to_string(),
            fb_access_token: Some("fb-token".to_string()),
            fb_graph_base_url: FB_GRAPH_BASE_URL.to_string(),
            fb_graph_version: FB_GRAPH_VERSION.to_string(),
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: OPENAI_BASE_URL.to_string(),
            openai_model: OPENAI_MODEL.to_string(),
            bucket_name: Some("meal-photos".to_string()),
            s3_region: None,
            s3_endpoint: None,
            aws_region: Some("ap-northeast-1".to_string()),
            presigned_url_ttl_secs: PRESIGNED_URL_TTL_SECS,
            event_bus_name: EVENT_BUS_NAME.to_string(),
            notify_backend: NotifyBackend::Sns,
            topic_arn: Some("arn:aws:sns:ap-northeast-1:123456789012:calories".to_string()),
            recipient_email: None,
            smtp_host: None,
            smtp_port: SMTP_PORT,
            smtp_user: None,
            smtp_password: Some("hunter2".to_string()),
            smtp_from: None,
            smtp_tls: true,
            poll_interval_secs: POLL_INTERVAL_SECS,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
        }
    }

    #[test]
    fn complete_config_validates_for_every_stage() {
        let config = base();
        for stage in [Stage::Fetcher, Stage::Orchestrator, Stage::Notifier] {
            config.validate_for(stage).unwrap();
        }
    }

    #[test]
    fn fetcher_does_not_need_vision_key() {
        let mut config = base();
        config.openai_api_key = None;
        assert!(config.validate_for(Stage::Fetcher).is_ok());

        let err = config.validate_for(Stage::Orchestrator).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn missing_feed_token_names_the_variable() {
        let mut config = base();
        config.fb_access_token = None;
        let err = config.validate_for(Stage::Fetcher).unwrap_err();
        assert_eq!(err.to_string(), "FB_ACCESS_TOKEN must be set to run the fetcher");
    }

    #[test]
    fn smtp_backend_requires_recipient_and_host() {
        let mut config = base();
        config.notify_backend = NotifyBackend::Smtp;
        assert!(config
            .validate_for(Stage::Notifier)
            .unwrap_err()
            .to_string()
            .contains("RECIPIENT_EMAIL"));

        config.recipient_email = Some("me@example.com".to_string());
        config.smtp_host = Some("smtp.example.com".to_string());
        config.smtp_from = Some("calsnap@example.com".to_string());
        assert!(config.validate_for(Stage::Notifier).is_ok());
    }

    #[test]
    fn presigned_ttl_is_bounded() {
        let mut config = base();
        config.presigned_url_ttl_secs = 0;
        assert!(config.validate_for(Stage::Orchestrator).is_err());
        config.presigned_url_ttl_secs = 604_801;
        assert!(config.validate_for(Stage::Orchestrator).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let rendered = format!("{:?}", Config(Box::new(base())));
        assert!(!rendered.contains("fb-token"));
        assert!(!rendered.contains("sk-test"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("meal-photos"));
    }

    #[test]
    fn notify_backend_parsing() {
        assert_eq!("SNS".parse::<NotifyBackend>().unwrap(), NotifyBackend::Sns);
        assert_eq!("email".parse::<NotifyBackend>().unwrap(), NotifyBackend::Smtp);
        assert!("pager".parse::<NotifyBackend>().is_err());
    }

    #[test]
    fn getters_expose_durations() {
        let config = Config(Box::new(base()));
        assert_eq!(config.presigned_url_ttl(), Duration::from_secs(3600));
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
    }

    #[test]
    fn s3_region_takes_precedence_over_aws_region() {
        let mut config = base();
        config.s3_region = Some("us-east-1".to_string());
        assert_eq!(Config(Box::new(config)).region(), Some("us-east-1"));
        assert_eq!(Config(Box::new(base())).region(), Some("ap-northeast-1"));
    }

    #[test]
    fn region_is_optional_for_every_stage() {
        let mut config = base();
        config.s3_region = None;
        config.aws_region = None;
        for stage in [Stage::Fetcher, Stage::Orchestrator, Stage::Notifier] {
            config.validate_for(stage).unwrap();
        }
        assert_eq!(Config(Box::new(config)).region(), None);
    }

    #[test]
    fn default_matches_documented_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.fb_graph_version, "v22.0");
        assert_eq!(config.openai_model, "gpt-4.1-mini");
        assert_eq!(config.event_bus_name, "default");
        assert_eq!(config.notify_backend, NotifyBackend::Sns);
        assert!(config.bucket_name.is_none());
    }
}
