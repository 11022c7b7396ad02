//! Delivery of outbound actions
//!
//! The evaluator hands each action to an [`ActionSink`]. Delivery is
//! attempted once; retry policy belongs to whatever sits behind the sink.

pub mod channel;
pub mod publisher;
pub mod sink;

pub use channel::ChannelSink;
pub use publisher::{PublishTarget, Publisher, DEFAULT_WEBHOOK_TIMEOUT};
pub use sink::{ActionSink, PublishError};
