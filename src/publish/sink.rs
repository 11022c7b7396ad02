//! Sink trait and shared error type

use crate::actions::OutboundAction;

/// Errors that can occur while publishing an action
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook error: {0}")]
    Webhook(String),

    #[error("Sink closed")]
    Closed,

    #[error("Multiple publish failures: {0:?}")]
    Multiple(Vec<PublishError>),
}

/// Destination for outbound actions
#[async_trait::async_trait]
pub trait ActionSink: Send + Sync {
    /// Deliver one action
    async fn publish(&self, action: &OutboundAction) -> Result<(), PublishError>;

    /// Human-readable name for logs
    fn name(&self) -> &str;
}
