//! Outbound actions handed to the platform
//!
//! A control change writes a new setpoint to an asset data stream. A
//! recommendation wraps one or more control changes for an operator to
//! accept or reject.

pub mod model;

pub use model::{ControlChange, Evidence, OutboundAction, Recommendation, StreamRef};
