//! Log and webhook publishing

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::sink::{ActionSink, PublishError};
use crate::actions::OutboundAction;

/// Where published actions are delivered
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PublishTarget {
    /// Log to tracing
    Log,
    /// HTTP webhook
    Webhook {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
}

/// Default bound on a single webhook delivery
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Publishes actions to every configured target
pub struct Publisher {
    client: reqwest::Client,
    targets: Vec<PublishTarget>,
}

impl Publisher {
    /// Create a publisher that only logs
    pub fn new() -> Self {
        Self::with_targets(vec![PublishTarget::Log])
    }

    pub fn with_targets(targets: Vec<PublishTarget>) -> Self {
        Self {
            client: http_client(DEFAULT_WEBHOOK_TIMEOUT),
            targets,
        }
    }

    /// Bound each webhook request; the runner waits on every publish
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    /// Add a delivery target
    pub fn with_target(mut self, target: PublishTarget) -> Self {
        self.targets.push(target);
        self
    }

    /// Deliver to a single target
    async fn publish_target(
        &self,
        target: &PublishTarget,
        action: &OutboundAction,
    ) -> Result<(), PublishError> {
        match target {
            PublishTarget::Log => {
                log_action(action);
                Ok(())
            }
            PublishTarget::Webhook { url, headers } => {
                self.send_webhook(url, headers, action).await
            }
        }
    }

    /// Send webhook notification
    async fn send_webhook(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        action: &OutboundAction,
    ) -> Result<(), PublishError> {
        let mut payload = serde_json::to_value(action)
            .map_err(|e| PublishError::Webhook(format!("Failed to encode action: {}", e)))?;
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(
                "published_at".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        let mut request = self.client.post(url).json(&payload);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(PublishError::Webhook(format!(
                "Webhook returned status {}",
                response.status()
            )));
        }

        tracing::debug!(
            asset = %action.asset(),
            url = %url,
            "Webhook delivery sent"
        );

        Ok(())
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ActionSink for Publisher {
    async fn publish(&self, action: &OutboundAction) -> Result<(), PublishError> {
        let mut errors = Vec::new();

        for target in &self.targets {
            if let Err(e) = self.publish_target(target, action).await {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PublishError::Multiple(errors))
        }
    }

    fn name(&self) -> &str {
        "publisher"
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

fn log_action(action: &OutboundAction) {
    match action {
        OutboundAction::ControlChange(cc) => {
            tracing::warn!(
                asset = %cc.resource.asset,
                stream = %cc.resource.stream,
                payload = cc.payload,
                expires = %cc.expiration_date.to_rfc3339(),
                "Control change published"
            );
        }
        OutboundAction::Recommendation(rec) => {
            tracing::warn!(
                asset = %rec.resource,
                kind = %rec.kind,
                control_changes = rec.control_changes.len(),
                expires = %rec.expiration_date.to_rfc3339(),
                "Recommendation published"
            );
        }
    }
}
