//! In-process sink backed by an mpsc channel

use tokio::sync::mpsc;

use super::sink::{ActionSink, PublishError};
use crate::actions::OutboundAction;

/// Forwards actions to an in-process receiver
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<OutboundAction>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<OutboundAction>) -> Self {
        Self { tx }
    }

    /// Create a sink together with its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundAction>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait::async_trait]
impl ActionSink for ChannelSink {
    async fn publish(&self, action: &OutboundAction) -> Result<(), PublishError> {
        self.tx
            .send(action.clone())
            .await
            .map_err(|_| PublishError::Closed)
    }

    fn name(&self) -> &str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ControlChange, StreamRef};

    fn action() -> OutboundAction {
        OutboundAction::ControlChange(ControlChange {
            resource: StreamRef::new("pump-01", "motor_speed_set_point"),
            payload: 90.0,
            expiration_date: chrono::Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_forwards_action() {
        let (sink, mut rx) = ChannelSink::channel(4);
        sink.publish(&action()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.asset(), "pump-01");
    }

    #[tokio::test]
    async fn test_closed_receiver() {
        let (sink, rx) = ChannelSink::channel(1);
        drop(rx);

        assert!(matches!(
            sink.publish(&action()).await,
            Err(PublishError::Closed)
        ));
    }
}
