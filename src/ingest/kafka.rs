//! Kafka consumer for telemetry ingest
//!
//! Consumes measurement payloads from Kafka topics and forwards them to the
//! evaluator. On restart, resumes from the last committed offset.
//!
//! ## Message Format
//!
//! Any payload accepted by [`crate::telemetry::decode_payload`]:
//! ```json
//! {"asset": "pump-01", "stream": "motor_temperature", "value": 85.2}
//! ```
//!
//! ## Configuration
//!
//! Environment variables:
//! - `KAFKA_BROKERS`: Comma-separated list of brokers (default: localhost:9092)
//! - `KAFKA_TOPICS`: Comma-separated list of topics to consume
//! - `KAFKA_GROUP_ID`: Consumer group ID (default: motorguard)
//! - `KAFKA_AUTO_OFFSET_RESET`: Where to start if no offset (earliest/latest, default: latest)

use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use tokio::sync::mpsc;

use super::{receiver_stream, MeasurementStream};
use crate::telemetry::{decode_payload, Measurement};

/// Kafka consumer configuration
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Kafka broker addresses
    pub brokers: String,
    /// Topics to consume from
    pub topics: Vec<String>,
    /// Consumer group ID
    pub group_id: String,
    /// Auto offset reset (earliest or latest)
    pub auto_offset_reset: String,
    /// Session timeout in ms
    pub session_timeout_ms: u32,
    /// Capacity of the channel feeding the evaluator
    pub channel_capacity: usize,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            topics: vec![],
            group_id: "motorguard".to_string(),
            auto_offset_reset: "latest".to_string(),
            session_timeout_ms: 30000,
            channel_capacity: 1024,
        }
    }
}

impl KafkaConfig {
    /// Create config from environment variables
    pub fn from_env() -> Option<Self> {
        let topics = std::env::var("KAFKA_TOPICS").ok()?;
        if topics.is_empty() {
            return None;
        }

        let defaults = Self::default();
        Some(Self {
            brokers: std::env::var("KAFKA_BROKERS").unwrap_or(defaults.brokers),
            topics: topics.split(',').map(|s| s.trim().to_string()).collect(),
            group_id: std::env::var("KAFKA_GROUP_ID").unwrap_or(defaults.group_id),
            auto_offset_reset: std::env::var("KAFKA_AUTO_OFFSET_RESET")
                .unwrap_or(defaults.auto_offset_reset),
            ..defaults
        })
    }
}

/// Kafka consumer producing a measurement stream
pub struct KafkaConsumer {
    config: KafkaConfig,
    consumer: StreamConsumer,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer
    pub fn new(config: KafkaConfig) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "false")
            .set("session.timeout.ms", config.session_timeout_ms.to_string())
            .create()?;

        Ok(Self { config, consumer })
    }

    /// Subscribe to configured topics
    pub fn subscribe(&self) -> Result<(), KafkaError> {
        let topics: Vec<&str> = self.config.topics.iter().map(|s| s.as_str()).collect();
        self.consumer.subscribe(&topics)?;
        tracing::info!("Subscribed to Kafka topics: {:?}", self.config.topics);
        Ok(())
    }

    /// Start consuming in background; the returned stream ends when the
    /// consumer task stops
    pub fn start(self) -> (MeasurementStream, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Measurement>(self.config.channel_capacity);
        let consumer = self.consumer;

        let handle = tokio::spawn(async move {
            tracing::info!("Kafka consumer started");

            loop {
                let message = match consumer.recv().await {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::error!(error = %e, "Kafka receive error");
                        // Back off on error
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                };

                let topic = message.topic().to_string();
                let partition = message.partition();
                let offset = message.offset();

                let Some(payload) = message.payload() else {
                    continue;
                };

                let measurements = match decode_payload(payload) {
                    Ok(measurements) => measurements,
                    Err(e) => {
                        tracing::error!(
                            topic = %topic,
                            partition = partition,
                            offset = offset,
                            error = %e,
                            "Failed to decode message"
                        );
                        continue;
                    }
                };

                let count = measurements.len();
                for measurement in measurements {
                    if tx.send(measurement).await.is_err() {
                        tracing::info!("Evaluator gone, Kafka consumer shutting down");
                        return;
                    }
                }

                // Commit offset once the batch is handed to the evaluator
                if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                    tracing::error!(
                        topic = %topic,
                        partition = partition,
                        offset = offset,
                        error = %e,
                        "Failed to commit offset"
                    );
                }

                tracing::debug!(
                    topic = %topic,
                    partition = partition,
                    offset = offset,
                    measurements = count,
                    "Kafka message forwarded"
                );
            }
        });

        (receiver_stream(rx), handle)
    }
}
