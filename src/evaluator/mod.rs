//! Threshold evaluation
//!
//! Turns a stream of measurements into at most one outbound action per
//! trigger reading. Auxiliary streams (speed, pressure, data quality) only
//! refresh the per-asset [`LatestValueTable`]; the trigger stream
//! (temperature) is compared against the asset's configured maximum.

pub mod config;
pub mod latest;
pub mod runner;
pub mod threshold;

pub use config::EvaluatorConfig;
pub use latest::LatestValueTable;
pub use runner::{Runner, RunnerHandle, RunnerStats};
pub use threshold::{Outcome, Skip, ThresholdEvaluator};
