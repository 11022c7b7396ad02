//! Measurement model and JSON payload decoding
//!
//! ## Payload Format
//!
//! A single reading:
//! ```json
//! {"asset": "pump-01", "stream": "motor_temperature", "value": 85.2}
//! ```
//!
//! An array of readings, or a batch envelope:
//! ```json
//! {"measurements": [
//!     {"asset": "pump-01", "stream": "motor_speed", "value": 1450, "timestamp": 1700000000000},
//!     {"asset": "pump-02", "stream": "motor_temperature", "value": 71.0}
//! ]}
//! ```
//!
//! `timestamp` is optional unix millis; arrival time is used when absent.
//! Boolean values are coerced to `1.0`/`0.0`; anything else non-numeric is
//! rejected.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single telemetry reading for one asset data stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Asset (equipment) identifier
    pub asset: String,
    /// Data stream / metric name
    pub stream: String,
    /// Numeric payload
    pub value: f64,
    /// Reading time
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    /// Create a measurement stamped with the current time
    pub fn new(asset: impl Into<String>, stream: impl Into<String>, value: f64) -> Self {
        Self {
            asset: asset.into(),
            stream: stream.into(),
            value,
            timestamp: Utc::now(),
        }
    }

    /// Override the reading time
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Wire shape of one reading before validation
#[derive(Debug, Deserialize)]
struct RawMeasurement {
    #[serde(alias = "resource")]
    asset: String,
    #[serde(alias = "data_stream")]
    stream: String,
    value: serde_json::Value,
    #[serde(default)]
    timestamp: Option<i64>,
}

impl RawMeasurement {
    fn into_measurement(self) -> Result<Measurement, DecodeError> {
        if self.asset.is_empty() {
            return Err(DecodeError::MissingField("asset"));
        }
        if self.stream.is_empty() {
            return Err(DecodeError::MissingField("stream"));
        }

        let value = match &self.value {
            serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| {
                DecodeError::NonNumeric(self.stream.clone(), self.value.to_string())
            })?,
            serde_json::Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => {
                return Err(DecodeError::NonNumeric(
                    self.stream.clone(),
                    other.to_string(),
                ))
            }
        };

        let timestamp = match self.timestamp {
            Some(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or(DecodeError::InvalidTimestamp(ms))?,
            None => Utc::now(),
        };

        Ok(Measurement {
            asset: self.asset,
            stream: self.stream,
            value,
            timestamp,
        })
    }
}

/// Decode a raw payload into measurements
pub fn decode_payload(payload: &[u8]) -> Result<Vec<Measurement>, DecodeError> {
    let value: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Parse(e.to_string()))?;
    decode_value(value)
}

/// Decode an already-parsed JSON document into measurements
pub fn decode_value(value: serde_json::Value) -> Result<Vec<Measurement>, DecodeError> {
    match value {
        serde_json::Value::Array(items) => items.into_iter().map(decode_one).collect(),
        serde_json::Value::Object(mut obj) => {
            // Batch format: {"measurements": [...]}
            if let Some(batch) = obj.remove("measurements") {
                let items = match batch {
                    serde_json::Value::Array(items) => items,
                    _ => {
                        return Err(DecodeError::Parse(
                            "'measurements' must be an array".to_string(),
                        ))
                    }
                };
                return items.into_iter().map(decode_one).collect();
            }
            decode_one(serde_json::Value::Object(obj)).map(|m| vec![m])
        }
        _ => Err(DecodeError::Parse(
            "expected JSON object or array".to_string(),
        )),
    }
}

fn decode_one(value: serde_json::Value) -> Result<Measurement, DecodeError> {
    let raw: RawMeasurement =
        serde_json::from_value(value).map_err(|e| DecodeError::Parse(e.to_string()))?;
    raw.into_measurement()
}

/// Payload decoding errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Non-numeric value for stream {0}: {1}")]
    NonNumeric(String, String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single() {
        let payload = br#"{"asset": "pump-01", "stream": "motor_temperature", "value": 85.5}"#;
        let measurements = decode_payload(payload).unwrap();

        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].asset, "pump-01");
        assert_eq!(measurements[0].stream, "motor_temperature");
        assert_eq!(measurements[0].value, 85.5);
    }

    #[test]
    fn test_decode_batch_with_timestamp() {
        let payload = br#"{
            "measurements": [
                {"asset": "pump-01", "stream": "motor_speed", "value": 100, "timestamp": 1700000000000},
                {"resource": "pump-02", "data_stream": "motor_temperature", "value": 71.0}
            ]
        }"#;
        let measurements = decode_payload(payload).unwrap();

        assert_eq!(measurements.len(), 2);
        assert_eq!(measurements[0].timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(measurements[1].asset, "pump-02");
        assert_eq!(measurements[1].stream, "motor_temperature");
    }

    #[test]
    fn test_decode_array_and_bool() {
        let payload = br#"[
            {"asset": "a", "stream": "running", "value": true},
            {"asset": "a", "stream": "running", "value": false}
        ]"#;
        let measurements = decode_payload(payload).unwrap();
        assert_eq!(measurements[0].value, 1.0);
        assert_eq!(measurements[1].value, 0.0);
    }

    #[test]
    fn test_decode_rejects_non_numeric() {
        let payload = br#"{"asset": "a", "stream": "motor_speed", "value": "fast"}"#;
        assert!(matches!(
            decode_payload(payload),
            Err(DecodeError::NonNumeric(_, _))
        ));
    }

    #[test]
    fn test_decode_rejects_empty_asset() {
        let payload = br#"{"asset": "", "stream": "motor_speed", "value": 1}"#;
        assert!(matches!(
            decode_payload(payload),
            Err(DecodeError::MissingField("asset"))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_payload(b"not json"), Err(DecodeError::Parse(_))));
        assert!(matches!(decode_payload(b"42"), Err(DecodeError::Parse(_))));
    }
}
