//! calsnap: feed photo → calorie OCR → notification.
//!
//! Each subcommand runs one pipeline stage. Configuration comes from the
//! environment (and `.env`); see `calsnap check-config`.

mod schedule;
mod setup;
mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use calsnap_core::error::LogLevel;
use calsnap_core::{AppError, Config, OcrCompleted, PipelineEvent, Stage, StoredObject};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::AsyncReadExt;

use crate::telemetry::{init_telemetry, LogFormat};

#[derive(Parser)]
#[command(name = "calsnap", about = "Feed photo calorie OCR pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the newest feed image, once
    Fetch,
    /// Run the fetcher on a fixed interval until interrupted
    Poll {
        /// Seconds between runs (default: POLL_INTERVAL_SECS, 300)
        #[arg(long)]
        interval: Option<u64>,
        /// Run a single tick and exit with its result
        #[arg(long)]
        once: bool,
    },
    /// Handle one bus event (JSON) read from a file or stdin
    Handle {
        /// Path to the event JSON; stdin when omitted
        #[arg(long)]
        event: Option<PathBuf>,
    },
    /// Run OCR for one stored object
    Ocr {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        key: String,
    },
    /// Send the notification for a calorie value
    Notify {
        #[arg(long)]
        calories: f64,
        #[arg(long, default_value = "")]
        bucket: String,
        #[arg(long, default_value = "")]
        key: String,
    },
    /// Validate configuration and print it with secrets redacted
    CheckConfig {
        /// Only validate what this stage needs
        #[arg(long, value_enum)]
        stage: Option<StageArg>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StageArg {
    Fetcher,
    Orchestrator,
    Notifier,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Fetcher => Stage::Fetcher,
            StageArg::Orchestrator => Stage::Orchestrator,
            StageArg::Notifier => Stage::Notifier,
        }
    }
}

/// Log a handler failure at the level its kind calls for.
fn log_failure(err: &anyhow::Error) {
    match err.downcast_ref::<AppError>() {
        Some(app) => {
            let code = app.error_code();
            let recoverable = app.is_recoverable();
            match app.log_level() {
                LogLevel::Debug => {
                    tracing::debug!(error_code = code, recoverable, error = %app, "Handler failed")
                }
                LogLevel::Warn => {
                    tracing::warn!(error_code = code, recoverable, error = %app, "Handler failed")
                }
                LogLevel::Error => {
                    tracing::error!(error_code = code, recoverable, error = %app, "Handler failed")
                }
            }
        }
        None => tracing::error!(error = %format!("{:#}", err), "Handler failed"),
    }
}

async fn read_event(path: Option<PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read event file {}", path.display())),
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("Failed to read event from stdin")?;
            Ok(raw)
        }
    }
}

async fn fetch_once(config: &Config) -> anyhow::Result<()> {
    let fetcher = setup::fetcher(config).await?;
    let outcome = fetcher.run().await?;
    tracing::info!(outcome = ?outcome, "Fetch finished");
    Ok(())
}

async fn poll(config: &Config, interval: Duration, once: bool) -> anyhow::Result<()> {
    let fetcher = setup::fetcher(config).await?;

    if once {
        let outcome = fetcher.run().await?;
        tracing::info!(outcome = ?outcome, "Fetch finished");
        return Ok(());
    }

    tracing::info!(interval_secs = interval.as_secs(), "Polling feed");
    schedule::poll_loop(&fetcher, interval, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await;
    Ok(())
}

async fn handle_event(config: &Config, raw: &str) -> anyhow::Result<()> {
    let event = PipelineEvent::from_json(raw)?;
    tracing::info!(detail_type = event.detail_type(), "Routing event");

    match event {
        PipelineEvent::ObjectCreated(envelope) => {
            run_ocr(config, &envelope.detail.stored_object()).await
        }
        PipelineEvent::OcrCompleted(envelope) => run_notify(config, &envelope.detail).await,
    }
}

async fn run_ocr(config: &Config, object: &StoredObject) -> anyhow::Result<()> {
    let orchestrator = setup::orchestrator(config).await?;
    let outcome = orchestrator.handle(object).await?;
    tracing::info!(outcome = ?outcome, "OCR finished");
    Ok(())
}

async fn run_notify(config: &Config, event: &OcrCompleted) -> anyhow::Result<()> {
    let notifier = setup::notifier(config).await?;
    let outcome = notifier.handle(event).await?;
    tracing::info!(outcome = ?outcome, "Notify finished");
    Ok(())
}

fn check_config(config: &Config, stage: Option<StageArg>) -> anyhow::Result<()> {
    println!("{:#?}", config.0);

    let stages = match stage {
        Some(stage) => vec![Stage::from(stage)],
        None => vec![Stage::Fetcher, Stage::Orchestrator, Stage::Notifier],
    };

    let mut failed = 0;
    for stage in stages {
        match config.validate_for(stage) {
            Ok(()) => println!("{}: ok", stage),
            Err(e) => {
                println!("{}: {}", stage, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} stage(s) are not configured", failed);
    }
    Ok(())
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        Commands::Fetch => fetch_once(&config).await,
        Commands::Poll { interval, once } => {
            let interval = interval
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval());
            if interval.is_zero() {
                anyhow::bail!("poll interval must be greater than 0");
            }
            poll(&config, interval, once).await
        }
        Commands::Handle { event } => {
            let raw = read_event(event).await?;
            handle_event(&config, &raw).await
        }
        Commands::Ocr { bucket, key } => run_ocr(&config, &StoredObject::new(bucket, key)).await,
        Commands::Notify {
            calories,
            bucket,
            key,
        } => {
            let object = StoredObject::new(bucket, key);
            run_notify(&config, &OcrCompleted::new(&object, "", calories)).await
        }
        Commands::CheckConfig { stage } => check_config(&config, stage),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());
    init_telemetry(format).map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!(environment = %config.environment(), "Configuration loaded");

    let result = run(cli, config).await;
    if let Err(e) = &result {
        log_failure(e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn poll_accepts_interval_and_once() {
        let cli = Cli::try_parse_from(["calsnap", "poll", "--interval", "60", "--once"]).unwrap();
        match cli.command {
            Commands::Poll { interval, once } => {
                assert_eq!(interval, Some(60));
                assert!(once);
            }
            _ => panic!("expected poll"),
        }
    }

    #[test]
    fn ocr_requires_bucket_and_key() {
        assert!(Cli::try_parse_from(["calsnap", "ocr", "--bucket", "meal-photos"]).is_err());
        assert!(
            Cli::try_parse_from(["calsnap", "ocr", "--bucket", "meal-photos", "--key", "1.jpg"])
                .is_ok()
        );
    }

    #[test]
    fn notify_reference_is_optional() {
        let cli = Cli::try_parse_from(["calsnap", "notify", "--calories", "420"]).unwrap();
        match cli.command {
            Commands::Notify {
                calories,
                bucket,
                key,
            } => {
                assert_eq!(calories, 420.0);
                assert!(bucket.is_empty());
                assert!(key.is_empty());
            }
            _ => panic!("expected notify"),
        }
    }

    #[test]
    fn check_config_stage_is_a_closed_set() {
        assert!(Cli::try_parse_from(["calsnap", "check-config", "--stage", "notifier"]).is_ok());
        assert!(Cli::try_parse_from(["calsnap", "check-config", "--stage", "mailer"]).is_err());
    }

    #[test]
    fn app_errors_survive_anyhow_for_logging() {
        let err: anyhow::Error = AppError::InvalidEvent("no route".to_string()).into();
        let app = err.downcast_ref::<AppError>().unwrap();
        assert_eq!(app.error_code(), "INVALID_EVENT");
        assert_eq!(app.log_level(), LogLevel::Debug);
    }
}
