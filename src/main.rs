//! motorguard server
//!
//! Run with: cargo run
//!
//! See [`motorguard::config`] for the `MOTORGUARD_*` environment variables.
//! Kafka ingest (built with `--features kafka`) is configured through
//! `KAFKA_BROKERS`, `KAFKA_TOPICS`, `KAFKA_GROUP_ID` and
//! `KAFKA_AUTO_OFFSET_RESET`. Log level is taken from `RUST_LOG`
//! (default: info).

use motorguard::api::run_server;
use motorguard::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "motorguard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("motorguard configuration:");
    tracing::info!("  Listen: {}:{}", config.host, config.port);
    match &config.parameters_file {
        Some(path) => tracing::info!("  Parameters file: {}", path.display()),
        None => tracing::info!("  Parameters file: none"),
    }
    tracing::info!("  Replay files: {}", config.replay_files.len());
    tracing::info!(
        "  Trigger: {} > {}",
        config.evaluator.trigger_stream,
        config.evaluator.threshold_parameter
    );
    tracing::info!(
        "  Setpoint: {} = {} x {}",
        config.evaluator.setpoint_stream,
        config.evaluator.prerequisite_stream,
        config.evaluator.reduction_factor
    );
    tracing::info!(
        "  Action expiration: {} seconds",
        config.evaluator.expiration.as_secs()
    );
    tracing::info!(
        "  Data quality gating: {}",
        if config.evaluator.data_quality_gating {
            "ENABLED"
        } else {
            "DISABLED"
        }
    );
    tracing::info!("  Publish targets: {:?}", config.publish_targets);
    tracing::info!("  Webhook timeout: {}s", config.webhook_timeout.as_secs());

    run_server(config).await
}
