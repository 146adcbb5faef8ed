//! Configuration management for the heart rate monitor

use crate::constants::{DEFAULT_BPM_HISTORY_SIZE, DEFAULT_FINGER_DEBOUNCE_MS, DEFAULT_SAMPLE_WINDOW_SIZE};
use crate::estimators::{create_estimator, Estimator, EstimatorKind};
use crate::sample::IntensityMethod;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rolling window length for the frequency-domain estimator
    pub sample_window_size: usize,

    /// Averaging period of the time-domain estimator; `None` selects the
    /// frequency-domain estimator
    pub averaging_period_seconds: Option<u32>,

    /// How long a finger must stay in place before it counts as present
    pub debounce_ms: u64,

    /// Number of FFT estimates averaged into each published value
    pub bpm_history_size: usize,

    /// Per-frame diagnostic logging
    pub logging_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_window_size: DEFAULT_SAMPLE_WINDOW_SIZE,
            averaging_period_seconds: None,
            debounce_ms: DEFAULT_FINGER_DEBOUNCE_MS,
            bpm_history_size: DEFAULT_BPM_HISTORY_SIZE,
            logging_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Operating mode selected by this configuration
    #[must_use]
    pub fn estimator_kind(&self) -> EstimatorKind {
        match self.averaging_period_seconds {
            Some(averaging_period_seconds) => EstimatorKind::TimeDomain {
                averaging_period_seconds,
            },
            None => EstimatorKind::Frequency {
                window_size: self.sample_window_size,
                history_size: self.bpm_history_size,
            },
        }
    }

    /// Intensity combination for the selected mode
    #[must_use]
    pub fn intensity_method(&self) -> IntensityMethod {
        self.estimator_kind().intensity_method()
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Create the estimator for the selected mode
    pub fn create_estimator(&self) -> Result<Box<dyn Estimator>> {
        create_estimator(self.estimator_kind())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_window_size < 2 {
            return Err(Error::ConfigError(
                "Sample window size must be at least 2".to_string(),
            ));
        }
        if self.bpm_history_size == 0 {
            return Err(Error::ConfigError(
                "BPM history size must be greater than 0".to_string(),
            ));
        }
        if self.averaging_period_seconds == Some(0) {
            return Err(Error::ConfigError(
                "Averaging period must be greater than 0 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Heart Rate Monitor Configuration

# FFT window length (samples)
sample_window_size: 128

# Seconds per time-domain averaging window; omit or null for FFT mode
averaging_period_seconds: null

# Finger debounce (milliseconds)
debounce_ms: 2000

# FFT estimates averaged per published value
bpm_history_size: 150

# Per-frame diagnostics
logging_enabled: false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample_window_size, 128);
        assert_eq!(config.debounce(), Duration::from_millis(2000));
        assert!(config.validate().is_ok());
        assert_eq!(config.intensity_method(), IntensityMethod::Sum);
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_yaml("averaging_period_seconds: 10\n").unwrap();
        assert_eq!(config.debounce_ms, 2000);
        assert_eq!(
            config.estimator_kind(),
            EstimatorKind::TimeDomain {
                averaging_period_seconds: 10
            }
        );
        assert_eq!(config.intensity_method(), IntensityMethod::Mean);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.sample_window_size = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bpm_history_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.averaging_period_seconds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            Config::from_yaml("sample_window_size: [1, 2"),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("hrm-config-{}.yaml", std::process::id()));
        let config = Config {
            averaging_period_seconds: Some(15),
            logging_enabled: true,
            ..Config::default()
        };
        config.to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
