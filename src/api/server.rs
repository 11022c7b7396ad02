use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    get_parameters, health_check, ingest, list_parameters, put_parameters, stats, AppState,
};
use crate::config::AppConfig;
use crate::evaluator::{Runner, ThresholdEvaluator};
use crate::ingest::{filtered, merge, receiver_stream, replay_file, MeasurementStream};
use crate::params::InMemoryParameterStore;
use crate::publish::Publisher;

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Telemetry
        .route("/ingest", post(ingest))
        // Asset parameters
        .route("/parameters", get(list_parameters))
        .route("/parameters/:asset", get(get_parameters).put(put_parameters))
        // Stats
        .route("/stats", get(stats))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Wire sources, evaluator and publisher, then serve the HTTP API until
/// CTRL+C
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let params = Arc::new(match &config.parameters_file {
        Some(path) => InMemoryParameterStore::from_file(path)?,
        None => {
            tracing::warn!("No parameters file configured, every asset starts unconfigured");
            InMemoryParameterStore::new()
        }
    });

    // Measurement sources
    let (ingest_tx, ingest_rx) = mpsc::channel(config.channel_capacity);
    let mut sources: Vec<MeasurementStream> = vec![receiver_stream(ingest_rx)];

    for path in &config.replay_files {
        sources.push(replay_file(path).await?);
    }

    #[cfg(feature = "kafka")]
    let kafka_handle = match crate::ingest::KafkaConfig::from_env() {
        Some(kafka_config) => {
            let consumer = crate::ingest::KafkaConsumer::new(kafka_config)?;
            consumer.subscribe()?;
            let (stream, handle) = consumer.start();
            sources.push(stream);
            Some(handle)
        }
        None => None,
    };

    let events = filtered(merge(sources), config.stream_filter.clone());

    // Evaluator
    let evaluator = ThresholdEvaluator::new(config.evaluator.clone(), params.clone());
    let publisher =
        Publisher::with_targets(config.publish_targets.clone()).with_timeout(config.webhook_timeout);
    let mut runner = Runner::new(evaluator, Arc::new(publisher)).start(events);

    let state = Arc::new(AppState {
        params,
        ingest_tx,
        stats: runner.stats(),
    });

    // Build router
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Starting motorguard on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    #[cfg(feature = "kafka")]
    if let Some(handle) = kafka_handle {
        handle.abort();
    }

    runner.stop().await;
    let runner = runner.join().await?;
    let final_stats = runner.stats().read().clone();
    tracing::info!(
        received = final_stats.received,
        published = final_stats.published,
        publish_failures = final_stats.publish_failures,
        "motorguard stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, stopping evaluator...");
}
