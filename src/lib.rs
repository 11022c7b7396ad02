//! motorguard: threshold-triggered motor protection
//!
//! Consumes asset telemetry, compares motor temperature against per-asset
//! configured maximums and, on a breach, lowers the motor speed setpoint,
//! either directly (closed loop) or through an operator recommendation.
//!
//! # Features
//!
//! - **Per-Asset State**: last speed, pressure and data quality per asset,
//!   never shared across assets
//! - **Closed/Open Loop**: direct control changes or wrapped recommendations
//! - **Data-Quality Gating**: optional suppression on poor data quality
//! - **Merged Sources**: HTTP ingest, NDJSON replay and Kafka in one stream
//! - **Publishing**: log and webhook targets
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use motorguard::evaluator::{EvaluatorConfig, Outcome, ThresholdEvaluator};
//! use motorguard::params::{AssetParameters, InMemoryParameterStore};
//! use motorguard::telemetry::Measurement;
//!
//! let params = Arc::new(InMemoryParameterStore::new());
//! params.upsert(
//!     "pump-01",
//!     AssetParameters::new()
//!         .with("temperature_max_threshold", 80.0)
//!         .with("closed_loop", false),
//! );
//!
//! let mut evaluator = ThresholdEvaluator::new(EvaluatorConfig::default(), params);
//! evaluator.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));
//!
//! if let Outcome::Action(action) =
//!     evaluator.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0))
//! {
//!     println!("{:?}", action);
//! }
//! ```

pub mod actions;
pub mod api;
pub mod config;
pub mod evaluator;
pub mod ingest;
pub mod params;
pub mod publish;
pub mod telemetry;

// Re-export commonly used types
pub use actions::{ControlChange, OutboundAction, Recommendation};
pub use config::{AppConfig, ConfigError};
pub use evaluator::{EvaluatorConfig, Outcome, Skip, ThresholdEvaluator};
pub use telemetry::Measurement;
