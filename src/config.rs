//! Engine settings, loadable from JSON.
//!
//! Every field has a default matching the fixed constants of the tracker and
//! batch fitter, so an empty `{}` document is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::PLANE_COEFFS;

/// Noise levels for the constant-rate Kalman predictor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Diagonal of the process noise Q = q·I₃
    pub process_noise: f64,
    /// Diagonal of the measurement noise R = r·I₂
    pub measurement_noise: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.001,
            measurement_noise: 1.0,
        }
    }
}

/// Settings for the batched plane fitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Point-sets with fewer valid rows get all-zero coefficients
    pub min_valid_rows: usize,
    /// Worker threads; 1 runs sequentially on the caller's thread
    pub threads: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_valid_rows: 4,
            threads: 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kalman: KalmanConfig,
    pub batch: BatchConfig,
}

impl KalmanConfig {
    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [
            ("process_noise", self.process_noise),
            ("measurement_noise", self.measurement_noise),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::Config(format!(
                    "kalman.{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl BatchConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.min_valid_rows < PLANE_COEFFS {
            return Err(EngineError::Config(format!(
                "batch.min_valid_rows must be at least {}, got {}",
                PLANE_COEFFS, self.min_valid_rows
            )));
        }
        if self.threads == 0 {
            return Err(EngineError::Config("batch.threads must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.kalman.validate()?;
        self.batch.validate()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.kalman.process_noise, 0.001);
        assert_eq!(config.kalman.measurement_noise, 1.0);
        assert_eq!(config.batch.min_valid_rows, 4);
        assert_eq!(config.batch.threads, 1);
    }

    #[test]
    fn test_partial_override() {
        let config =
            EngineConfig::from_json_str(r#"{"kalman": {"measurement_noise": 4.0}, "batch": {"threads": 8}}"#)
                .unwrap();
        assert_eq!(config.kalman.process_noise, 0.001);
        assert_eq!(config.kalman.measurement_noise, 4.0);
        assert_eq!(config.batch.threads, 8);
        assert_eq!(config.batch.min_valid_rows, 4);
    }

    #[test]
    fn test_validation_errors() {
        let err = EngineConfig::from_json_str(r#"{"kalman": {"process_noise": -1.0}}"#).unwrap_err();
        assert!(matches!(err, EngineError::Config(ref msg) if msg.contains("process_noise")));

        assert!(EngineConfig::from_json_str(r#"{"batch": {"threads": 0}}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"batch": {"min_valid_rows": 2}}"#).is_err());
        assert!(EngineConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/track_matrix.json").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
