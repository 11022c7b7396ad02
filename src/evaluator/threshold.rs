//! Threshold decision rule

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::config::EvaluatorConfig;
use super::latest::LatestValueTable;
use crate::actions::{ControlChange, Evidence, OutboundAction, Recommendation, StreamRef};
use crate::params::{AssetParameters, ParameterStore};
use crate::telemetry::Measurement;

/// Result of evaluating one measurement
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Auxiliary reading recorded, nothing to decide
    Tracked,
    /// Stream is neither tracked nor the trigger
    Ignored,
    /// Trigger reading at or below the configured maximum
    WithinThreshold,
    /// Trigger breached but no action could be built
    Skipped(Skip),
    /// Action to publish
    Action(OutboundAction),
}

/// Reasons a threshold breach does not produce an action.
///
/// None of these are fatal; the evaluator logs and moves on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Skip {
    #[error("no {parameter} configured for asset")]
    ThresholdNotConfigured { parameter: String },

    #[error("no {stream} value seen for asset yet")]
    PrerequisiteMissing { stream: String },

    #[error("computed setpoint {0} is invalid")]
    InvalidSetpoint(f64),

    #[error("measurement value {0} is not finite")]
    InvalidMeasurement(f64),

    #[error("data quality {value} does not meet minimum {minimum}")]
    DataQualityBelowMinimum { value: f64, minimum: f64 },
}

impl Skip {
    /// Stable label for counting skips
    pub fn kind(&self) -> &'static str {
        match self {
            Skip::ThresholdNotConfigured { .. } => "threshold_not_configured",
            Skip::PrerequisiteMissing { .. } => "prerequisite_missing",
            Skip::InvalidSetpoint(_) => "invalid_setpoint",
            Skip::InvalidMeasurement(_) => "invalid_measurement",
            Skip::DataQualityBelowMinimum { .. } => "data_quality_below_minimum",
        }
    }
}

/// Per-asset threshold evaluator.
///
/// Owns its [`LatestValueTable`], so every decision only ever sees readings
/// of the asset being evaluated.
pub struct ThresholdEvaluator {
    config: EvaluatorConfig,
    params: Arc<dyn ParameterStore>,
    latest: LatestValueTable,
}

impl ThresholdEvaluator {
    pub fn new(config: EvaluatorConfig, params: Arc<dyn ParameterStore>) -> Self {
        Self {
            config,
            params,
            latest: LatestValueTable::new(),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn latest(&self) -> &LatestValueTable {
        &self.latest
    }

    /// Evaluate one measurement
    pub fn on_measurement(&mut self, measurement: &Measurement) -> Outcome {
        let asset = measurement.asset.as_str();
        let stream = measurement.stream.as_str();

        if self.config.is_tracked(stream) {
            self.latest.update(asset, stream, measurement.value);
            return Outcome::Tracked;
        }
        if stream != self.config.trigger_stream {
            return Outcome::Ignored;
        }

        let params = self.params.get(asset).unwrap_or_default();
        let Some(threshold) = params.number(&self.config.threshold_parameter) else {
            if let Some(raw) = params.get(&self.config.threshold_parameter) {
                tracing::warn!(
                    asset = %asset,
                    parameter = %self.config.threshold_parameter,
                    value = ?raw,
                    "Threshold parameter is not numeric, treating as not configured"
                );
            }
            return Outcome::Skipped(Skip::ThresholdNotConfigured {
                parameter: self.config.threshold_parameter.clone(),
            });
        };

        if !measurement.value.is_finite() {
            return Outcome::Skipped(Skip::InvalidMeasurement(measurement.value));
        }
        if measurement.value <= threshold {
            return Outcome::WithinThreshold;
        }

        if let Some(skip) = self.check_data_quality(asset, &params) {
            return Outcome::Skipped(skip);
        }

        let Some(prerequisite) = self.latest.get(asset, &self.config.prerequisite_stream) else {
            return Outcome::Skipped(Skip::PrerequisiteMissing {
                stream: self.config.prerequisite_stream.clone(),
            });
        };

        let setpoint = prerequisite * self.config.reduction_factor;
        if !setpoint.is_finite() || setpoint < 0.0 {
            return Outcome::Skipped(Skip::InvalidSetpoint(setpoint));
        }

        let expiration_date = self.expiration_from(measurement.timestamp);
        let control_change = ControlChange {
            resource: StreamRef::new(asset, self.config.setpoint_stream.as_str()),
            payload: setpoint,
            expiration_date,
        };

        let closed_loop = params
            .flag(&self.config.closed_loop_parameter)
            .unwrap_or(false);

        if closed_loop {
            return Outcome::Action(OutboundAction::ControlChange(control_change));
        }

        Outcome::Action(OutboundAction::Recommendation(self.recommend(
            measurement,
            threshold,
            prerequisite,
            closed_loop,
            control_change,
        )))
    }

    /// Gate on the asset's last data-quality reading, if gating is enabled.
    ///
    /// A non-finite reading never satisfies the minimum.
    fn check_data_quality(&self, asset: &str, params: &AssetParameters) -> Option<Skip> {
        if !self.config.data_quality_gating {
            return None;
        }
        let minimum = params.number(&self.config.data_quality_parameter)?;
        let value = self.latest.get(asset, &self.config.data_quality_stream)?;

        (!value.is_finite() || value < minimum)
            .then_some(Skip::DataQualityBelowMinimum { value, minimum })
    }

    fn expiration_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.config.expiration)
            .ok()
            .and_then(|window| start.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn recommend(
        &self,
        measurement: &Measurement,
        threshold: f64,
        prerequisite: f64,
        closed_loop: bool,
        control_change: ControlChange,
    ) -> Recommendation {
        let mut evidences = vec![Evidence::Markdown {
            title: "Threshold breach".to_string(),
            markdown: format!(
                "| Reading | Value |\n|---|---|\n| {} | {} |\n| {} | {} |\n| {} | {} |\n| {} | {} |",
                measurement.stream,
                measurement.value,
                self.config.threshold_parameter,
                threshold,
                self.config.prerequisite_stream,
                prerequisite,
                self.config.setpoint_stream,
                control_change.payload,
            ),
        }];
        if let Some(url) = &self.config.evidence_image_url {
            evidences.push(Evidence::Image {
                title: format!("{} trend", measurement.stream),
                url: url.clone(),
            });
        }

        let mut metadata = HashMap::new();
        metadata.insert(
            measurement.stream.clone(),
            serde_json::json!(measurement.value),
        );
        metadata.insert(
            self.config.threshold_parameter.clone(),
            serde_json::json!(threshold),
        );
        metadata.insert(
            self.config.prerequisite_stream.clone(),
            serde_json::json!(prerequisite),
        );

        Recommendation {
            resource: measurement.asset.clone(),
            kind: self.config.recommendation_kind.clone(),
            expiration_date: control_change.expiration_date,
            control_changes: vec![control_change],
            description: self.config.guidance.clone(),
            evidences,
            auto_accepted: self
                .config
                .auto_accept_from_closed_loop
                .then_some(closed_loop),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::InMemoryParameterStore;
    use std::time::Duration;

    fn store_with(asset: &str, threshold: f64, closed_loop: bool) -> Arc<InMemoryParameterStore> {
        let store = Arc::new(InMemoryParameterStore::new());
        store.upsert(
            asset,
            AssetParameters::new()
                .with("temperature_max_threshold", threshold)
                .with("closed_loop", closed_loop),
        );
        store
    }

    fn evaluator(store: Arc<InMemoryParameterStore>) -> ThresholdEvaluator {
        ThresholdEvaluator::new(EvaluatorConfig::default(), store)
    }

    fn expect_action(outcome: Outcome) -> OutboundAction {
        match outcome {
            Outcome::Action(action) => action,
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_recommendation_when_open_loop() {
        let mut eval = evaluator(store_with("pump-01", 80.0, false));

        assert_eq!(
            eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0)),
            Outcome::Tracked
        );
        let action =
            expect_action(eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0)));

        match action {
            OutboundAction::Recommendation(rec) => {
                assert_eq!(rec.resource, "pump-01");
                assert_eq!(rec.kind, "Decrease Speed");
                assert_eq!(rec.control_changes.len(), 1);
                assert_eq!(rec.control_changes[0].payload, 90.0);
                assert_eq!(rec.control_changes[0].resource.stream, "motor_speed_set_point");
                assert_eq!(rec.auto_accepted, Some(false));
                assert_eq!(rec.metadata["motor_temperature"], serde_json::json!(85.0));
            }
            other => panic!("expected recommendation, got {:?}", other),
        }
    }

    #[test]
    fn test_direct_control_change_when_closed_loop() {
        let mut eval = evaluator(store_with("pump-01", 80.0, true));

        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));
        let action =
            expect_action(eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0)));

        match action {
            OutboundAction::ControlChange(cc) => {
                assert_eq!(cc.payload, 90.0);
                assert_eq!(cc.resource, StreamRef::new("pump-01", "motor_speed_set_point"));
            }
            other => panic!("expected control change, got {:?}", other),
        }
    }

    #[test]
    fn test_expiration_window_from_reading_time() {
        let mut eval = ThresholdEvaluator::new(
            EvaluatorConfig::default().with_expiration(Duration::from_secs(120)),
            store_with("pump-01", 80.0, true),
        );
        let at = Utc::now();

        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 50.0));
        let action = expect_action(
            eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 81.0).at(at)),
        );

        let cc = action.control_changes()[0].clone();
        assert_eq!(cc.expiration_date, at + chrono::Duration::seconds(120));
    }

    #[test]
    fn test_missing_threshold_skips() {
        let mut eval = evaluator(Arc::new(InMemoryParameterStore::new()));
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));

        for temperature in [10.0, 85.0, 1000.0] {
            let outcome =
                eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", temperature));
            assert!(matches!(
                outcome,
                Outcome::Skipped(Skip::ThresholdNotConfigured { .. })
            ));
        }
    }

    #[test]
    fn test_at_or_below_threshold_no_action() {
        let mut eval = evaluator(store_with("pump-01", 80.0, false));
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));

        for temperature in [20.0, 79.9, 80.0] {
            assert_eq!(
                eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", temperature)),
                Outcome::WithinThreshold
            );
        }
    }

    #[test]
    fn test_missing_prerequisite_skips() {
        let mut eval = evaluator(store_with("pump-01", 80.0, false));

        let outcome = eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0));
        assert_eq!(
            outcome,
            Outcome::Skipped(Skip::PrerequisiteMissing {
                stream: "motor_speed".to_string()
            })
        );
    }

    #[test]
    fn test_negative_setpoint_skips() {
        let mut eval = evaluator(store_with("pump-01", 80.0, false));
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", -10.0));

        let outcome = eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0));
        assert!(matches!(outcome, Outcome::Skipped(Skip::InvalidSetpoint(_))));
    }

    #[test]
    fn test_non_finite_measurement_skips() {
        let mut eval = evaluator(store_with("pump-01", 80.0, false));
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));

        let outcome =
            eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", f64::NAN));
        assert!(matches!(outcome, Outcome::Skipped(Skip::InvalidMeasurement(_))));
    }

    #[test]
    fn test_no_cross_asset_interference() {
        let store = Arc::new(InMemoryParameterStore::new());
        for asset in ["pump-a", "pump-b"] {
            store.upsert(
                asset,
                AssetParameters::new()
                    .with("temperature_max_threshold", 80.0)
                    .with("closed_loop", true),
            );
        }
        let mut eval = evaluator(store);

        eval.on_measurement(&Measurement::new("pump-a", "motor_speed", 100.0));

        // B has no speed of its own; A's value must not be used
        let outcome = eval.on_measurement(&Measurement::new("pump-b", "motor_temperature", 90.0));
        assert!(matches!(
            outcome,
            Outcome::Skipped(Skip::PrerequisiteMissing { .. })
        ));

        eval.on_measurement(&Measurement::new("pump-b", "motor_speed", 200.0));
        eval.on_measurement(&Measurement::new("pump-a", "motor_speed", 50.0));

        let b = expect_action(eval.on_measurement(&Measurement::new("pump-b", "motor_temperature", 90.0)));
        let a = expect_action(eval.on_measurement(&Measurement::new("pump-a", "motor_temperature", 90.0)));
        assert_eq!(b.control_changes()[0].payload, 180.0);
        assert_eq!(a.control_changes()[0].payload, 45.0);
        assert_eq!(b.asset(), "pump-b");
    }

    #[test]
    fn test_data_quality_gating() {
        let store = Arc::new(InMemoryParameterStore::new());
        store.upsert(
            "pump-01",
            AssetParameters::new()
                .with("temperature_max_threshold", 80.0)
                .with("dataquality_min_threshold", 0.8),
        );

        let mut gated = ThresholdEvaluator::new(
            EvaluatorConfig::default().with_data_quality_gating(true),
            store.clone(),
        );
        let mut ungated = evaluator(store);

        for eval in [&mut gated, &mut ungated] {
            eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));
            eval.on_measurement(&Measurement::new("pump-01", "data_quality", 0.5));
        }

        let reading = Measurement::new("pump-01", "motor_temperature", 85.0);
        assert_eq!(
            gated.on_measurement(&reading),
            Outcome::Skipped(Skip::DataQualityBelowMinimum {
                value: 0.5,
                minimum: 0.8
            })
        );
        assert!(matches!(ungated.on_measurement(&reading), Outcome::Action(_)));

        gated.on_measurement(&Measurement::new("pump-01", "data_quality", 0.95));
        assert!(matches!(gated.on_measurement(&reading), Outcome::Action(_)));
    }

    fn gated_evaluator(params: AssetParameters) -> ThresholdEvaluator {
        let store = Arc::new(InMemoryParameterStore::new());
        store.upsert("pump-01", params.with("temperature_max_threshold", 80.0));
        let mut eval = ThresholdEvaluator::new(
            EvaluatorConfig::default().with_data_quality_gating(true),
            store,
        );
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));
        eval
    }

    #[test]
    fn test_data_quality_unobserved_does_not_block() {
        let mut eval = gated_evaluator(AssetParameters::new().with("dataquality_min_threshold", 0.8));

        let outcome = eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0));
        assert!(matches!(outcome, Outcome::Action(_)));
    }

    #[test]
    fn test_data_quality_without_minimum_does_not_block() {
        let mut eval = gated_evaluator(AssetParameters::new());
        eval.on_measurement(&Measurement::new("pump-01", "data_quality", 0.1));

        let outcome = eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0));
        assert!(matches!(outcome, Outcome::Action(_)));
    }

    #[test]
    fn test_non_finite_data_quality_blocks() {
        let mut eval = gated_evaluator(AssetParameters::new().with("dataquality_min_threshold", 0.8));

        for quality in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            eval.on_measurement(&Measurement::new("pump-01", "data_quality", quality));
            let outcome =
                eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0));
            assert!(
                matches!(outcome, Outcome::Skipped(Skip::DataQualityBelowMinimum { minimum, .. }) if minimum == 0.8),
                "data quality {} should block, got {:?}",
                quality,
                outcome
            );
        }
    }

    #[test]
    fn test_numeric_text_threshold() {
        let store = Arc::new(InMemoryParameterStore::new());
        store.upsert(
            "pump-01",
            AssetParameters::new()
                .with("temperature_max_threshold", "80")
                .with("closed_loop", true),
        );
        let mut eval = evaluator(store);
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));

        assert_eq!(
            eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 79.0)),
            Outcome::WithinThreshold
        );
        let action =
            expect_action(eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0)));
        assert_eq!(action.control_changes()[0].payload, 90.0);
    }

    #[test]
    fn test_non_numeric_text_threshold_skips() {
        let store = Arc::new(InMemoryParameterStore::new());
        store.upsert(
            "pump-01",
            AssetParameters::new().with("temperature_max_threshold", "hot"),
        );
        let mut eval = evaluator(store);
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));

        let outcome = eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0));
        assert!(matches!(
            outcome,
            Outcome::Skipped(Skip::ThresholdNotConfigured { .. })
        ));
    }

    #[test]
    fn test_guidance_and_evidence() {
        let mut eval = ThresholdEvaluator::new(
            EvaluatorConfig::default()
                .with_guidance("Reduce speed to let the motor cool down")
                .with_evidence_image("https://example.com/temperature.png"),
            store_with("pump-01", 80.0, false),
        );
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));

        let action =
            expect_action(eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0)));
        let OutboundAction::Recommendation(rec) = action else {
            panic!("expected recommendation");
        };
        assert_eq!(
            rec.description.as_deref(),
            Some("Reduce speed to let the motor cool down")
        );
        assert_eq!(rec.evidences.len(), 2);

        match &rec.evidences[0] {
            Evidence::Markdown { title, markdown } => {
                assert_eq!(title, "Threshold breach");
                assert!(markdown.contains("| motor_temperature | 85 |"));
                assert!(markdown.contains("| temperature_max_threshold | 80 |"));
                assert!(markdown.contains("| motor_speed_set_point | 90 |"));
            }
            other => panic!("expected markdown summary, got {:?}", other),
        }
        assert!(matches!(
            &rec.evidences[1],
            Evidence::Image { url, .. } if url == "https://example.com/temperature.png"
        ));
    }

    #[test]
    fn test_breach_summary_without_image() {
        let mut eval = evaluator(store_with("pump-01", 80.0, false));
        eval.on_measurement(&Measurement::new("pump-01", "motor_speed", 100.0));

        let action =
            expect_action(eval.on_measurement(&Measurement::new("pump-01", "motor_temperature", 85.0)));
        let OutboundAction::Recommendation(rec) = action else {
            panic!("expected recommendation");
        };
        assert_eq!(rec.evidences.len(), 1);
        assert!(matches!(&rec.evidences[0], Evidence::Markdown { .. }));
    }

    #[test]
    fn test_unknown_stream_ignored() {
        let mut eval = evaluator(store_with("pump-01", 80.0, false));
        assert_eq!(
            eval.on_measurement(&Measurement::new("pump-01", "vibration", 3.0)),
            Outcome::Ignored
        );
        assert!(eval.latest().is_empty());
    }
}
