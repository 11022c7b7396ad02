//! Last known value per asset data stream

use std::collections::HashMap;

/// Most recent reading per `(asset, stream)`.
///
/// Entries are never evicted; the table grows with the set of assets seen,
/// which is bounded by the fleet size.
#[derive(Debug, Default)]
pub struct LatestValueTable {
    assets: HashMap<String, HashMap<String, f64>>,
}

impl LatestValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading, returning the value it replaced
    pub fn update(&mut self, asset: &str, stream: &str, value: f64) -> Option<f64> {
        self.assets
            .entry(asset.to_string())
            .or_default()
            .insert(stream.to_string(), value)
    }

    pub fn get(&self, asset: &str, stream: &str) -> Option<f64> {
        self.assets.get(asset)?.get(stream).copied()
    }

    /// All tracked values for one asset
    pub fn asset(&self, asset: &str) -> Option<&HashMap<String, f64>> {
        self.assets.get(asset)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Total number of `(asset, stream)` entries
    pub fn len(&self) -> usize {
        self.assets.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
