//! Builds each pipeline handler from configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use calsnap_clients::{
    EventBridgePublisher, GraphFeedClient, NotificationPublisher, OpenAiVisionClient,
    SmtpPublisher, SnsPublisher,
};
use calsnap_core::{ChainedCalorieParser, Config, NotifyBackend, PatternCalorieParser, Stage};
use calsnap_pipeline::{ImageFetcher, Notifier, OcrOrchestrator};
use calsnap_storage::create_storage;

fn aws_region(config: &Config) -> Option<String> {
    config
        .aws_region()
        .or_else(|| config.s3_region())
        .map(String::from)
}

pub async fn fetcher(config: &Config) -> Result<ImageFetcher> {
    config.validate_for(Stage::Fetcher)?;

    let token = config
        .fb_access_token()
        .context("FB_ACCESS_TOKEN not configured")?;
    let feed = GraphFeedClient::new(
        config.fb_graph_base_url(),
        config.fb_graph_version(),
        token,
        config.http_timeout(),
    )?;
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;

    Ok(ImageFetcher::new(Arc::new(feed), storage))
}

pub async fn orchestrator(config: &Config) -> Result<OcrOrchestrator> {
    config.validate_for(Stage::Orchestrator)?;

    let api_key = config
        .openai_api_key()
        .context("OPENAI_API_KEY not configured")?;
    let vision = OpenAiVisionClient::new(
        config.openai_base_url(),
        api_key,
        config.openai_model(),
        config.http_timeout(),
    )?;
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;
    let events = EventBridgePublisher::new(config.event_bus_name(), aws_region(config)).await;
    let parser = ChainedCalorieParser::new().with(PatternCalorieParser::estimated_burn_ja());

    tracing::info!(
        bucket = config.bucket_name().unwrap_or_default(),
        event_bus = %config.event_bus_name(),
        model = %config.openai_model(),
        "OCR orchestrator ready"
    );

    Ok(OcrOrchestrator::new(
        storage,
        Arc::new(vision),
        Arc::new(events),
        Arc::new(parser),
    )
    .with_presign_ttl(config.presigned_url_ttl()))
}

pub async fn notifier(config: &Config) -> Result<Notifier> {
    config.validate_for(Stage::Notifier)?;

    let publisher: Arc<dyn NotificationPublisher> = match config.notify_backend() {
        NotifyBackend::Sns => {
            let topic_arn = config.topic_arn().context("TOPIC_ARN not configured")?;
            Arc::new(SnsPublisher::new(topic_arn, aws_region(config)).await)
        }
        NotifyBackend::Smtp => Arc::new(SmtpPublisher::from_config(config)?),
    };

    Ok(Notifier::new(publisher))
}
