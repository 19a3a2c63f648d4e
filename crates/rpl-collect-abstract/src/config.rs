use crate::event::SimTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sampling_period must be positive")]
    ZeroSamplingPeriod,
    #[error("timeout_ms must be positive")]
    ZeroTimeout,
}

/// Run parameters, fixed for the whole duration of a collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Directory receiving every log and screenshot.
    pub data_dir: PathBuf,
    /// Total run length, in milliseconds of simulated time.
    pub timeout_ms: u64,
    /// Interval between instrumentation samples, in microseconds.
    pub sampling_period: SimTime,
    /// Viewport origin passed to the visualizer.
    pub screenshot_origin: (i32, i32),
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            timeout_ms: 1_200_000,
            sampling_period: 60_000_000,
            screenshot_origin: (0, 0),
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling_period == 0 {
            return Err(ConfigError::ZeroSamplingPeriod);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Timeout expressed in the same unit as event timestamps.
    pub fn timeout_us(&self) -> SimTime {
        self.timeout_ms.saturating_mul(1_000)
    }
}

/// Partial configuration, e.g. parsed from a TOML file or built from CLI flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectorConfigOverride {
    pub data_dir: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub sampling_period: Option<SimTime>,
    pub screenshot_origin: Option<(i32, i32)>,
}

impl CollectorConfigOverride {
    pub fn apply_to(&self, config: &mut CollectorConfig) {
        if let Some(v) = &self.data_dir {
            config.data_dir = v.clone();
        }
        if let Some(v) = self.timeout_ms {
            config.timeout_ms = v;
        }
        if let Some(v) = self.sampling_period {
            config.sampling_period = v;
        }
        if let Some(v) = self.screenshot_origin {
            config.screenshot_origin = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_only_touches_set_fields() {
        let mut config = CollectorConfig::default();
        let over: CollectorConfigOverride = toml::from_str("sampling_period = 60").unwrap();
        over.apply_to(&mut config);
        assert_eq!(config.sampling_period, 60);
        assert_eq!(config.timeout_ms, 1_200_000);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn rejects_zero_period() {
        let config = CollectorConfig {
            sampling_period: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSamplingPeriod));
    }

    #[test]
    fn timeout_converts_to_microseconds() {
        let config = CollectorConfig {
            timeout_ms: 1_500,
            ..Default::default()
        };
        assert_eq!(config.timeout_us(), 1_500_000);
    }
}
