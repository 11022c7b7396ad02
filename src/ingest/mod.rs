//! Measurement sources
//!
//! Supports multiple ingest methods:
//! - HTTP API (default, see [`crate::api`])
//! - Newline-delimited JSON replay files
//! - Kafka consumer (optional, enable with `kafka` feature)
//!
//! Every source is exposed as a [`MeasurementStream`]. Sources are merged
//! into a single sequence before evaluation, so readings from different
//! metric families (temperature/speed and data quality) interleave in
//! arrival order and are dispatched by stream name downstream.

pub mod replay;

#[cfg(feature = "kafka")]
pub mod kafka;

#[cfg(feature = "kafka")]
pub use kafka::{KafkaConfig, KafkaConsumer};
pub use replay::replay_file;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

use crate::telemetry::{Measurement, StreamFilter};

/// Boxed asynchronous sequence of measurements
pub type MeasurementStream = BoxStream<'static, Measurement>;

/// Adapt a channel receiver into a stream
pub fn receiver_stream(rx: mpsc::Receiver<Measurement>) -> MeasurementStream {
    stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|measurement| (measurement, rx))
    })
    .boxed()
}

/// Merge several sources into one stream that ends when all of them end
pub fn merge(sources: Vec<MeasurementStream>) -> MeasurementStream {
    stream::select_all(sources).boxed()
}

/// Drop measurements whose stream name the filter rejects
pub fn filtered(source: MeasurementStream, filter: StreamFilter) -> MeasurementStream {
    if filter.is_empty() {
        return source;
    }
    source
        .filter(move |m| futures::future::ready(filter.matches(&m.stream)))
        .boxed()
}
