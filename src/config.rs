use std::fs;
use std::path::Path;
use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::metrics::health::DEFAULT_HEALTH_WINDOW;

/// Tunables for the monitoring engine and the server around it.
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Samples retained per identity before FIFO eviction
    pub capacity: usize,
    /// Most-recent samples used for health classification
    pub health_window: usize,
    /// Samples older than this are removed by the retention sweep
    pub retention_hours: u32,
    /// How often the retention sweep runs
    pub sweep_interval_secs: u64,
    /// SSE push interval for the real-time feed
    pub stream_interval_ms: u64,
    /// Width of the real-time window
    pub realtime_window_minutes: u32,
    /// Listen address
    pub bind: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000,
            health_window: DEFAULT_HEALTH_WINDOW,
            retention_hours: 24,
            sweep_interval_secs: 3_600,
            stream_interval_ms: 1_000,
            realtime_window_minutes: 5,
            bind: "0.0.0.0:3000".into(),
        }
    }
}

impl MonitorConfig {
    pub fn from_toml_str(raw: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let positive: [(&'static str, u64); 6] = [
            ("capacity", self.capacity as u64),
            ("health_window", self.health_window as u64),
            ("retention_hours", u64::from(self.retention_hours)),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("stream_interval_ms", self.stream_interval_ms),
            ("realtime_window_minutes", u64::from(self.realtime_window_minutes)),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".into(),
                });
            }
        }
        if self.bind.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "bind",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn retention_horizon(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.retention_hours))
    }

    pub fn sweep_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.sweep_interval_secs)
    }

    pub fn stream_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.stream_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = MonitorConfig::from_toml_str("").expect("parse");
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.capacity, 1_000);
        assert_eq!(config.retention_horizon(), chrono::Duration::hours(24));
        assert_eq!(config.sweep_interval(), StdDuration::from_secs(3_600));
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = MonitorConfig::from_toml_str("capacity = 50\nbind = \"127.0.0.1:9000\"\n")
            .expect("parse");
        assert_eq!(config.capacity, 50);
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.health_window, 10);
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = MonitorConfig::from_toml_str("capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "capacity", .. }));
        let err = MonitorConfig::from_toml_str("retention_hours = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "retention_hours", .. }));
        let err = MonitorConfig::from_toml_str("realtime_window_minutes = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "realtime_window_minutes", .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = MonitorConfig::from_toml_str("capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = MonitorConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
