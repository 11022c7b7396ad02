//! Parameter lookup
//!
//! The evaluator only needs a synchronous read. The in-memory store is seeded
//! from a JSON file shaped like:
//!
//! ```json
//! {
//!     "pump-01": {"temperature_max_threshold": 80, "closed_loop": false},
//!     "pump-02": {"temperature_max_threshold": 75, "closed_loop": true,
//!                 "dataquality_min_threshold": 0.8}
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use dashmap::DashMap;

use super::model::AssetParameters;

/// Read-only lookup of per-asset parameters
pub trait ParameterStore: Send + Sync {
    /// Parameters configured for `asset`, `None` when the asset is unknown
    fn get(&self, asset: &str) -> Option<AssetParameters>;
}

/// Concurrent in-memory parameter store
#[derive(Debug, Default)]
pub struct InMemoryParameterStore {
    assets: DashMap<String, AssetParameters>,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON parameters file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParameterError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ParameterError::Io(path.display().to_string(), e))?;
        let store = Self::from_json(&content)?;

        tracing::info!(
            path = %path.display(),
            assets = store.len(),
            "Loaded asset parameters"
        );
        Ok(store)
    }

    /// Parse a store from JSON text
    pub fn from_json(content: &str) -> Result<Self, ParameterError> {
        let parsed: HashMap<String, AssetParameters> =
            serde_json::from_str(content).map_err(|e| ParameterError::Parse(e.to_string()))?;

        let store = Self::new();
        for (asset, params) in parsed {
            store.upsert(asset, params);
        }
        Ok(store)
    }

    /// Insert or replace an asset's parameters, returning the previous set
    pub fn upsert(&self, asset: impl Into<String>, params: AssetParameters) -> Option<AssetParameters> {
        self.assets.insert(asset.into(), params)
    }

    /// Remove an asset's parameters
    pub fn remove(&self, asset: &str) -> Option<AssetParameters> {
        self.assets.remove(asset).map(|(_, params)| params)
    }

    /// Snapshot of every configured asset
    pub fn snapshot(&self) -> HashMap<String, AssetParameters> {
        self.assets
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl ParameterStore for InMemoryParameterStore {
    fn get(&self, asset: &str) -> Option<AssetParameters> {
        self.assets.get(asset).map(|entry| entry.value().clone())
    }
}

/// Parameter loading errors
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("Failed to read {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("Invalid parameters document: {0}")]
    Parse(String),
}
