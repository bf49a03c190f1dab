use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub docker_socket: String,
    /// How often the live-source set is reconciled against Docker.
    pub poll_interval_ms: u64,
    /// Batch tick for real-time subscribers.
    pub batch_interval_ms: u64,
    /// Shared entry channel depth. Producers block when it fills —
    /// backpressure instead of silent drops.
    pub channel_capacity: usize,
    /// Buffered-message markers that make an unindented, timestamp-less
    /// line continue the open entry.
    pub multiline_markers: Vec<String>,
    /// Safety cap on physical lines per logical entry.
    pub max_entry_lines: usize,
}

impl CollectorConfig {
    /// Load configuration from file or environment variables.
    /// Priority: Environment Variables > Config File > Defaults.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("COLLECTOR_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/tailcast/collector.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!(
                "Config file not found at {}, using environment variables",
                config_path
            );
            Self::from_env()
        };

        // Environment variables override file config for critical settings.
        if let Ok(socket) = std::env::var("DOCKER_SOCKET") {
            config.docker_socket = socket;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: CollectorConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            docker_socket: std::env::var("DOCKER_SOCKET").unwrap_or_default(),
            poll_interval_ms: env_parsed("COLLECTOR_POLL_INTERVAL_MS")
                .unwrap_or(defaults.poll_interval_ms),
            batch_interval_ms: env_parsed("COLLECTOR_BATCH_INTERVAL_MS")
                .unwrap_or(defaults.batch_interval_ms),
            channel_capacity: env_parsed("COLLECTOR_CHANNEL_CAPACITY")
                .unwrap_or(defaults.channel_capacity),
            multiline_markers: std::env::var("COLLECTOR_MULTILINE_MARKERS")
                .map(|raw| {
                    raw.split(',')
                        .map(|m| m.trim().to_string())
                        .filter(|m| !m.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.multiline_markers),
            max_entry_lines: env_parsed("COLLECTOR_MAX_ENTRY_LINES")
                .unwrap_or(defaults.max_entry_lines),
        }
    }

    /// Validate that configuration values are sane.
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be > 0".to_string());
        }
        if self.batch_interval_ms == 0 {
            return Err("batch_interval_ms must be > 0".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be > 0".to_string());
        }
        if self.max_entry_lines == 0 {
            return Err("max_entry_lines must be > 0".to_string());
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            docker_socket: String::new(),
            poll_interval_ms: 1_000,
            batch_interval_ms: 100,
            channel_capacity: 1_024,
            multiline_markers: vec!["[sql]:".to_string()],
            max_entry_lines: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(config.poll_interval_ms, 1_000);
        assert_eq!(config.batch_interval_ms, 100);
        assert_eq!(config.channel_capacity, 1_024);
        assert_eq!(config.multiline_markers, vec!["[sql]:".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let config = CollectorConfig {
            poll_interval_ms: 0,
            ..CollectorConfig::default()
        };
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("poll_interval_ms"));
    }

    #[test]
    fn test_validate_zero_batch_interval() {
        let config = CollectorConfig {
            batch_interval_ms: 0,
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_channel_capacity() {
        let config = CollectorConfig {
            channel_capacity: 0,
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_max_entry_lines() {
        let config = CollectorConfig {
            max_entry_lines: 0,
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: CollectorConfig = toml::from_str("batch_interval_ms = 250").unwrap();
        assert_eq!(config.batch_interval_ms, 250);
        assert_eq!(config.poll_interval_ms, 1_000);
        assert_eq!(config.multiline_markers, vec!["[sql]:".to_string()]);
    }

    #[test]
    fn test_full_toml_round_trip() {
        let source = CollectorConfig {
            docker_socket: "unix:///var/run/docker.sock".into(),
            poll_interval_ms: 500,
            batch_interval_ms: 50,
            channel_capacity: 64,
            multiline_markers: vec!["[sql]:".into(), "[trace]:".into()],
            max_entry_lines: 20,
        };
        let text = toml::to_string(&source).unwrap();
        let parsed: CollectorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.channel_capacity, 64);
        assert_eq!(parsed.multiline_markers.len(), 2);
    }
}
