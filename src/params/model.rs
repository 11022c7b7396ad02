//! Parameter value types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single configured parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl ParameterValue {
    /// Numeric view of the value; text such as `"80"` is parsed
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::Number(n) => Some(*n),
            ParameterValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            ParameterValue::Bool(_) => None,
        }
    }

    /// Boolean view of the value (numbers are true when non-zero, text must
    /// read `true` or `false`)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            ParameterValue::Number(n) => Some(*n != 0.0),
            ParameterValue::Text(s) => s.trim().to_ascii_lowercase().parse::<bool>().ok(),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Number(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

/// Named parameters configured for one asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetParameters {
    values: HashMap<String, ParameterValue>,
}

impl AssetParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParameterValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.values.get(name)
    }

    /// Numeric parameter, `None` when absent or not a number
    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(ParameterValue::as_f64)
    }

    /// Boolean parameter, `None` when absent or not boolean-like
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(ParameterValue::as_bool)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
