//! Evaluator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Stream names, parameter names and action settings for one evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Stream compared against the configured maximum
    pub trigger_stream: String,
    /// Stream whose last value the new setpoint is derived from
    pub prerequisite_stream: String,
    /// Stream the control change writes to
    pub setpoint_stream: String,
    /// Data-quality metric stream
    pub data_quality_stream: String,
    /// Extra streams whose last value is kept for context
    pub auxiliary_streams: Vec<String>,
    /// Asset parameter holding the trigger maximum
    pub threshold_parameter: String,
    /// Asset parameter holding the data-quality minimum
    pub data_quality_parameter: String,
    /// Asset parameter selecting direct control over recommendations
    pub closed_loop_parameter: String,
    /// Multiplier applied to the prerequisite value
    pub reduction_factor: f64,
    /// Lifetime of published actions
    #[serde(with = "duration_serde")]
    pub expiration: Duration,
    /// Recommendation category label
    pub recommendation_kind: String,
    /// Guidance text attached to recommendations
    #[serde(default)]
    pub guidance: Option<String>,
    /// Image evidence attached to recommendations
    #[serde(default)]
    pub evidence_image_url: Option<String>,
    /// Set `auto_accepted` on recommendations from the closed-loop flag
    pub auto_accept_from_closed_loop: bool,
    /// Suppress actions while the asset's data quality is below its minimum
    pub data_quality_gating: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            trigger_stream: "motor_temperature".to_string(),
            prerequisite_stream: "motor_speed".to_string(),
            setpoint_stream: "motor_speed_set_point".to_string(),
            data_quality_stream: "data_quality".to_string(),
            auxiliary_streams: vec!["motor_pressure".to_string()],
            threshold_parameter: "temperature_max_threshold".to_string(),
            data_quality_parameter: "dataquality_min_threshold".to_string(),
            closed_loop_parameter: "closed_loop".to_string(),
            reduction_factor: 0.9,
            expiration: Duration::from_secs(10 * 60),
            recommendation_kind: "Decrease Speed".to_string(),
            guidance: None,
            evidence_image_url: None,
            auto_accept_from_closed_loop: true,
            data_quality_gating: false,
        }
    }
}

impl EvaluatorConfig {
    /// Set the reduction factor
    pub fn with_reduction_factor(mut self, factor: f64) -> Self {
        self.reduction_factor = factor;
        self
    }

    /// Set the action lifetime
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    /// Enable or disable data-quality gating
    pub fn with_data_quality_gating(mut self, enabled: bool) -> Self {
        self.data_quality_gating = enabled;
        self
    }

    /// Attach guidance text to recommendations
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    /// Attach an image evidence to recommendations
    pub fn with_evidence_image(mut self, url: impl Into<String>) -> Self {
        self.evidence_image_url = Some(url.into());
        self
    }

    /// Whether the stream only refreshes the latest-value table
    pub fn is_tracked(&self, stream: &str) -> bool {
        stream == self.prerequisite_stream
            || stream == self.data_quality_stream
            || self.auxiliary_streams.iter().any(|s| s == stream)
    }

    /// Reject settings the evaluator cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.reduction_factor.is_finite() || self.reduction_factor < 0.0 {
            return Err(ConfigError::Invalid(
                "reduction_factor".to_string(),
                self.reduction_factor.to_string(),
            ));
        }
        if self.expiration.is_zero() {
            return Err(ConfigError::Invalid(
                "expiration".to_string(),
                "0s".to_string(),
            ));
        }
        if self.is_tracked(&self.trigger_stream) {
            return Err(ConfigError::Invalid(
                "trigger_stream".to_string(),
                format!("{} is also a tracked stream", self.trigger_stream),
            ));
        }
        Ok(())
    }
}

/// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct DurationHelper {
        secs: u64,
        #[serde(default)]
        nanos: u32,
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        DurationHelper {
            secs: duration.as_secs(),
            nanos: duration.subsec_nanos(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let helper = DurationHelper::deserialize(deserializer)?;
        Ok(Duration::new(helper.secs, helper.nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.reduction_factor, 0.9);
        assert_eq!(config.expiration.as_secs(), 600);
        assert!(!config.data_quality_gating);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tracked_streams() {
        let config = EvaluatorConfig::default();
        assert!(config.is_tracked("motor_speed"));
        assert!(config.is_tracked("motor_pressure"));
        assert!(config.is_tracked("data_quality"));
        assert!(!config.is_tracked("motor_temperature"));
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(EvaluatorConfig::default()
            .with_reduction_factor(-0.5)
            .validate()
            .is_err());
        assert!(EvaluatorConfig::default()
            .with_reduction_factor(f64::NAN)
            .validate()
            .is_err());
        assert!(EvaluatorConfig::default()
            .with_expiration(Duration::ZERO)
            .validate()
            .is_err());

        let mut config = EvaluatorConfig::default();
        config.auxiliary_streams.push("motor_temperature".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip_expiration() {
        let config = EvaluatorConfig::default().with_expiration(Duration::from_secs(90));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EvaluatorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.expiration, Duration::from_secs(90));
    }
}
