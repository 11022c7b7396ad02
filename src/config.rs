//! Service configuration from environment variables
//!
//! - `MOTORGUARD_HOST`: Bind address (default: 0.0.0.0)
//! - `MOTORGUARD_PORT`: Port number (default: 8080)
//! - `MOTORGUARD_PARAMETERS_FILE`: JSON file with per-asset parameters
//! - `MOTORGUARD_REPLAY_FILES`: Comma-separated NDJSON files to replay at startup
//! - `MOTORGUARD_CHANNEL_CAPACITY`: Ingest channel capacity (default: 1024)
//! - `MOTORGUARD_WEBHOOK_URL`: Publish actions to this webhook as well as the log
//! - `MOTORGUARD_WEBHOOK_TIMEOUT_SECS`: Per-request webhook timeout (default: 30)
//! - `MOTORGUARD_STREAM_FILTER`: Comma-separated stream-name patterns to consume
//! - `MOTORGUARD_REDUCTION_FACTOR`: Setpoint multiplier (default: 0.9)
//! - `MOTORGUARD_EXPIRATION_SECS`: Action lifetime in seconds (default: 600)
//! - `MOTORGUARD_CLOSED_LOOP_AUTO_ACCEPT`: Mirror closed-loop into `auto_accepted` (default: true)
//! - `MOTORGUARD_DATA_QUALITY_GATING`: Suppress actions on poor data quality (default: false)
//! - `MOTORGUARD_GUIDANCE`: Guidance text attached to recommendations
//! - `MOTORGUARD_EVIDENCE_IMAGE_URL`: Image evidence attached to recommendations

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::evaluator::EvaluatorConfig;
use crate::publish::{PublishTarget, DEFAULT_WEBHOOK_TIMEOUT};
use crate::telemetry::StreamFilter;

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub parameters_file: Option<PathBuf>,
    pub replay_files: Vec<PathBuf>,
    pub channel_capacity: usize,
    pub stream_filter: StreamFilter,
    pub publish_targets: Vec<PublishTarget>,
    pub webhook_timeout: Duration,
    pub evaluator: EvaluatorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            parameters_file: None,
            replay_files: vec![],
            channel_capacity: 1024,
            stream_filter: StreamFilter::accept_all(),
            publish_targets: vec![PublishTarget::Log],
            webhook_timeout: DEFAULT_WEBHOOK_TIMEOUT,
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from `MOTORGUARD_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut evaluator = defaults.evaluator;
        if let Some(factor) = parse_var::<f64>(&var, "MOTORGUARD_REDUCTION_FACTOR")? {
            evaluator.reduction_factor = factor;
        }
        if let Some(secs) = parse_var::<u64>(&var, "MOTORGUARD_EXPIRATION_SECS")? {
            evaluator.expiration = Duration::from_secs(secs);
        }
        if let Some(enabled) = parse_flag(&var, "MOTORGUARD_CLOSED_LOOP_AUTO_ACCEPT")? {
            evaluator.auto_accept_from_closed_loop = enabled;
        }
        if let Some(enabled) = parse_flag(&var, "MOTORGUARD_DATA_QUALITY_GATING")? {
            evaluator.data_quality_gating = enabled;
        }
        evaluator.guidance = var("MOTORGUARD_GUIDANCE");
        evaluator.evidence_image_url = var("MOTORGUARD_EVIDENCE_IMAGE_URL");
        evaluator.validate()?;

        let stream_filter = match var("MOTORGUARD_STREAM_FILTER") {
            Some(patterns) => StreamFilter::parse(&patterns).map_err(|e| {
                ConfigError::Invalid("MOTORGUARD_STREAM_FILTER".to_string(), e.to_string())
            })?,
            None => defaults.stream_filter,
        };

        let mut publish_targets = defaults.publish_targets;
        if let Some(url) = var("MOTORGUARD_WEBHOOK_URL") {
            publish_targets.push(PublishTarget::Webhook {
                url,
                headers: Default::default(),
            });
        }

        let webhook_timeout = match parse_var::<u64>(&var, "MOTORGUARD_WEBHOOK_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "MOTORGUARD_WEBHOOK_TIMEOUT_SECS".to_string(),
                    "0".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.webhook_timeout,
        };

        let replay_files: Vec<PathBuf> = var("MOTORGUARD_REPLAY_FILES")
            .map(|files| {
                files
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default();

        let channel_capacity = parse_var::<usize>(&var, "MOTORGUARD_CHANNEL_CAPACITY")?
            .unwrap_or(defaults.channel_capacity);
        if channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "MOTORGUARD_CHANNEL_CAPACITY".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            host: var("MOTORGUARD_HOST").unwrap_or(defaults.host),
            port: parse_var::<u16>(&var, "MOTORGUARD_PORT")?.unwrap_or(defaults.port),
            parameters_file: var("MOTORGUARD_PARAMETERS_FILE").map(PathBuf::from),
            replay_files,
            channel_capacity,
            stream_filter,
            publish_targets,
            webhook_timeout,
            evaluator,
        })
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid(key.to_string(), raw.clone()))
        })
        .transpose()
}

fn parse_flag(var: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<bool>, ConfigError> {
    var(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(key.to_string(), raw.clone())),
        })
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    Invalid(String, String),
}
