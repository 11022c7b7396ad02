//! Telemetry data model
//!
//! Measurements arrive from the platform as small JSON documents keyed by
//! asset and data-stream name. This module decodes them and provides the
//! stream-name predicate used to select which metric families are consumed.

pub mod filter;
pub mod model;

pub use filter::StreamFilter;
pub use model::{decode_payload, decode_value, DecodeError, Measurement};
