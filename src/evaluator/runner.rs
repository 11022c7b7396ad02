//! Background evaluation loop

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;

use super::threshold::{Outcome, ThresholdEvaluator};
use crate::actions::OutboundAction;
use crate::ingest::MeasurementStream;
use crate::publish::ActionSink;
use crate::telemetry::Measurement;

/// Counters exposed on `/stats`
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunnerStats {
    pub received: u64,
    pub tracked: u64,
    pub ignored: u64,
    pub within_threshold: u64,
    /// Skipped trigger readings per reason
    pub skipped: HashMap<String, u64>,
    pub published: u64,
    pub publish_failures: u64,
    /// Last publish time (unix millis)
    pub last_published: Option<i64>,
}

/// Feeds measurements through the evaluator and publishes resulting actions
pub struct Runner {
    evaluator: ThresholdEvaluator,
    sink: Arc<dyn ActionSink>,
    stats: Arc<RwLock<RunnerStats>>,
}

impl Runner {
    pub fn new(evaluator: ThresholdEvaluator, sink: Arc<dyn ActionSink>) -> Self {
        Self {
            evaluator,
            sink,
            stats: Arc::new(RwLock::new(RunnerStats::default())),
        }
    }

    /// Shared handle to the counters
    pub fn stats(&self) -> Arc<RwLock<RunnerStats>> {
        Arc::clone(&self.stats)
    }

    pub fn evaluator(&self) -> &ThresholdEvaluator {
        &self.evaluator
    }

    /// Evaluate one measurement and publish the action, if any
    pub async fn process(&mut self, measurement: Measurement) -> Outcome {
        let outcome = self.evaluator.on_measurement(&measurement);

        {
            let mut s = self.stats.write();
            s.received += 1;
            match &outcome {
                Outcome::Tracked => s.tracked += 1,
                Outcome::Ignored => s.ignored += 1,
                Outcome::WithinThreshold => s.within_threshold += 1,
                Outcome::Skipped(skip) => {
                    *s.skipped.entry(skip.kind().to_string()).or_default() += 1;
                }
                Outcome::Action(_) => {}
            }
        }

        match &outcome {
            Outcome::Skipped(skip) => {
                tracing::info!(
                    asset = %measurement.asset,
                    stream = %measurement.stream,
                    value = measurement.value,
                    reason = %skip,
                    "Skipping threshold action"
                );
            }
            Outcome::Action(action) => {
                tracing::debug!(
                    asset = %measurement.asset,
                    value = measurement.value,
                    kind = action.kind(),
                    "Threshold breached"
                );
                self.publish(action).await;
            }
            _ => {}
        }

        outcome
    }

    async fn publish(&self, action: &OutboundAction) {
        match self.sink.publish(action).await {
            Ok(()) => {
                let mut s = self.stats.write();
                s.published += 1;
                s.last_published = Some(chrono::Utc::now().timestamp_millis());
            }
            Err(e) => {
                tracing::error!(
                    asset = %action.asset(),
                    sink = %self.sink.name(),
                    error = %e,
                    "Failed to publish action"
                );
                self.stats.write().publish_failures += 1;
            }
        }
    }

    /// Consume `events` in a background task until the stream ends or the
    /// handle is stopped
    pub fn start(mut self, mut events: MeasurementStream) -> RunnerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let stats = self.stats();

        let join = tokio::spawn(async move {
            tracing::info!(sink = %self.sink.name(), "Evaluator runner started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Evaluator runner shutting down");
                        break;
                    }
                    next = events.next() => {
                        match next {
                            Some(measurement) => {
                                self.process(measurement).await;
                            }
                            None => {
                                tracing::info!("Measurement stream ended");
                                break;
                            }
                        }
                    }
                }
            }

            self
        });

        RunnerHandle {
            shutdown_tx: Some(shutdown_tx),
            join,
            stats,
        }
    }
}

/// Handle to a started [`Runner`]
pub struct RunnerHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    join: tokio::task::JoinHandle<Runner>,
    stats: Arc<RwLock<RunnerStats>>,
}

impl RunnerHandle {
    pub fn stats(&self) -> Arc<RwLock<RunnerStats>> {
        Arc::clone(&self.stats)
    }

    /// Signal the runner to stop after the measurement in flight
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }

    /// Wait for the runner to finish and take it back
    pub async fn join(self) -> Result<Runner, tokio::task::JoinError> {
        self.join.await
    }
}
