//! Control change and recommendation value objects

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target of a control change: one data stream on one asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamRef {
    pub asset: String,
    pub stream: String,
}

impl StreamRef {
    pub fn new(asset: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            stream: stream.into(),
        }
    }
}

/// New setpoint for an asset data stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlChange {
    pub resource: StreamRef,
    /// Setpoint value to write
    pub payload: f64,
    /// After this instant the platform discards the change
    pub expiration_date: DateTime<Utc>,
}

/// Supporting material attached to a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Evidence {
    Markdown { title: String, markdown: String },
    Image { title: String, url: String },
}

/// Operator-facing suggestion wrapping one or more control changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Asset the recommendation is about
    pub resource: String,
    /// Category label shown to the operator, e.g. "Decrease Speed"
    #[serde(rename = "type")]
    pub kind: String,
    pub control_changes: Vec<ControlChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidences: Vec<Evidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_accepted: Option<bool>,
    pub expiration_date: DateTime<Utc>,
    /// Readings that led to the recommendation
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Either kind of outbound action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "action", rename_all = "snake_case")]
pub enum OutboundAction {
    ControlChange(ControlChange),
    Recommendation(Recommendation),
}

impl OutboundAction {
    /// Asset the action targets
    pub fn asset(&self) -> &str {
        match self {
            OutboundAction::ControlChange(cc) => &cc.resource.asset,
            OutboundAction::Recommendation(rec) => &rec.resource,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundAction::ControlChange(_) => "control_change",
            OutboundAction::Recommendation(_) => "recommendation",
        }
    }

    /// Control changes carried by the action, directly or wrapped
    pub fn control_changes(&self) -> Vec<&ControlChange> {
        match self {
            OutboundAction::ControlChange(cc) => vec![cc],
            OutboundAction::Recommendation(rec) => rec.control_changes.iter().collect(),
        }
    }
}
