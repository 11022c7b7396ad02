//! Per-asset configuration parameters
//!
//! Thresholds and flags are owned by the platform and looked up
//! synchronously per asset. A missing parameter means "not configured",
//! which is distinct from a zero value.

pub mod model;
pub mod store;

pub use model::{AssetParameters, ParameterValue};
pub use store::{InMemoryParameterStore, ParameterError, ParameterStore};
