//! Loading [`RequesterConfig`] from TOML.
//!
//! Every key is optional; missing keys take the protocol defaults.
//!
//! ```toml
//! scheduler_topic = "/concert/scheduler/requests"
//! heartbeat_hz = 0.25
//! status_check_interval_ms = 500
//! default_priority = 0
//! outcome_timeout_ms = 30000
//! ```

use rocon_requester::RequesterConfig;
use rocon_types::Priority;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    Parse { message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    scheduler_topic: Option<String>,
    heartbeat_hz: Option<f64>,
    status_check_interval_ms: Option<u64>,
    default_priority: Option<i32>,
    outcome_timeout_ms: Option<u64>,
}

impl ConfigFile {
    fn into_config(self) -> Result<RequesterConfig, ConfigError> {
        let mut config = RequesterConfig::default();

        if let Some(topic) = self.scheduler_topic {
            if topic.is_empty() {
                return Err(ConfigError::Invalid {
                    key: "scheduler_topic",
                    message: "must not be empty".into(),
                });
            }
            config = config.with_scheduler_topic(topic);
        }
        if let Some(hz) = self.heartbeat_hz {
            if !hz.is_finite() || hz < 0.0 {
                return Err(ConfigError::Invalid {
                    key: "heartbeat_hz",
                    message: format!("{hz} is not a non-negative rate"),
                });
            }
            if hz > 0.0 && Duration::try_from_secs_f64(1.0 / hz).is_err() {
                return Err(ConfigError::Invalid {
                    key: "heartbeat_hz",
                    message: format!("{hz} gives a heartbeat period too long to represent"),
                });
            }
            config = config.with_heartbeat_hz(hz);
        }
        if let Some(ms) = self.status_check_interval_ms {
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    key: "status_check_interval_ms",
                    message: "must be positive".into(),
                });
            }
            config = config.with_status_check_interval(Duration::from_millis(ms));
        }
        if let Some(priority) = self.default_priority {
            config = config.with_default_priority(Priority(priority));
        }
        if let Some(ms) = self.outcome_timeout_ms {
            config = config.with_outcome_timeout(Duration::from_millis(ms));
        }

        Ok(config)
    }
}

/// Parse a requester config from TOML text.
pub fn parse_config(content: &str) -> Result<RequesterConfig, ConfigError> {
    let file: ConfigFile = toml::from_str(content).map_err(|e| ConfigError::Parse {
        message: e.to_string(),
    })?;
    file.into_config()
}

/// Read and parse a requester config file.
pub fn load_config(path: &Path) -> Result<RequesterConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocon_requester::DEFAULT_SCHEDULER_TOPIC;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, RequesterConfig::default());
        assert_eq!(config.scheduler_topic, DEFAULT_SCHEDULER_TOPIC);
    }

    #[test]
    fn test_all_keys() {
        let config = parse_config(
            r#"
scheduler_topic = "/sched"
heartbeat_hz = 2.0
status_check_interval_ms = 100
default_priority = 10000
outcome_timeout_ms = 1500
"#,
        )
        .unwrap();

        assert_eq!(config.scheduler_topic, "/sched");
        assert_eq!(config.heartbeat_hz, 2.0);
        assert_eq!(config.status_check_interval, Duration::from_millis(100));
        assert_eq!(config.default_priority, Priority::HIGH);
        assert_eq!(config.outcome_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = parse_config("heartbeat = 1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_negative_heartbeat_rejected() {
        let err = parse_config("heartbeat_hz = -1.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "heartbeat_hz",
                ..
            }
        ));
    }

    #[test]
    fn test_unrepresentable_heartbeat_rejected() {
        let err = parse_config("heartbeat_hz = 1e-300").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "heartbeat_hz",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_heartbeat_disables() {
        let config = parse_config("heartbeat_hz = 0.0").unwrap();
        assert_eq!(config.heartbeat_interval(), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_priority = -10000").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.default_priority, Priority::LOW);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
