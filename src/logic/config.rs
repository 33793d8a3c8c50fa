//! Monitor Configuration
//!
//! Defaults come from `constants.rs`, then an optional JSON file, then
//! `ENVMON_*` environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::logic::labels::{CommandTable, LabelTable};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    Env { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTIONS
// ============================================================================

/// MQTT broker connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive_secs: u64,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay_secs: u64,
    /// Bound on a single connect attempt
    pub connect_timeout_secs: u64,
    pub client_id_prefix: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BROKER_HOST.to_string(),
            port: DEFAULT_BROKER_PORT,
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            client_id_prefix: DEFAULT_CLIENT_ID_PREFIX.to_string(),
        }
    }
}

impl BrokerConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs.max(1))
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub sensor: String,
    pub output: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            sensor: DEFAULT_SENSOR_TOPIC.to_string(),
            output: DEFAULT_OUTPUT_TOPIC.to_string(),
        }
    }
}

/// Classifier artifact settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub enabled: bool,
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
    /// Treat a model without probability output as failing
    pub require_confidence: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            metadata_path: PathBuf::from(DEFAULT_MODEL_METADATA_PATH),
            require_confidence: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum records kept; oldest evicted first
    pub capacity: usize,
    /// Maximum events waiting to be drained
    pub ingest_queue_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_LOG_CAPACITY,
            ingest_queue_limit: DEFAULT_INGEST_QUEUE_LIMIT,
        }
    }
}

/// CSV mirror settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub csv_path: PathBuf,
    /// Load the existing file into the history at startup
    pub reload_on_startup: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            reload_on_startup: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub http_enabled: bool,
    pub bind: String,
    pub refresh_interval_ms: u64,
    /// Display timezone, hours east of UTC
    pub utc_offset_hours: i32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            http_enabled: true,
            bind: DEFAULT_HTTP_BIND.to_string(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

// ============================================================================
// MONITOR CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub broker: BrokerConfig,
    pub topics: TopicConfig,
    pub model: ModelConfig,
    pub history: HistoryConfig,
    pub persistence: PersistenceConfig,
    pub dashboard: DashboardConfig,
    /// Edge label text → label kind
    pub edge_labels: LabelTable,
    /// Label kind → actuation command
    pub commands: CommandTable,
}

impl MonitorConfig {
    /// Load from `ENVMON_CONFIG`, or the per-user config file if present,
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                dirs::config_dir()
                    .map(|dir| dir.join("envmon").join("config.json"))
                    .filter(|p| p.exists())
            });

        Self::from_sources(path.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn from_sources(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `ENVMON_*` overrides through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("ENVMON_BROKER_HOST") {
            self.broker.host = v;
        }
        if let Some(v) = lookup("ENVMON_BROKER_PORT") {
            self.broker.port = parse_env("ENVMON_BROKER_PORT", &v)?;
        }
        if let Some(v) = lookup("ENVMON_SENSOR_TOPIC") {
            self.topics.sensor = v;
        }
        if let Some(v) = lookup("ENVMON_OUTPUT_TOPIC") {
            self.topics.output = v;
        }
        if let Some(v) = lookup("ENVMON_MODEL_PATH") {
            self.model.model_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ENVMON_MODEL_METADATA") {
            self.model.metadata_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ENVMON_LOG_CAPACITY") {
            self.history.capacity = parse_env("ENVMON_LOG_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("ENVMON_CSV_ENABLED") {
            self.persistence.enabled = parse_flag("ENVMON_CSV_ENABLED", &v)?;
        }
        if let Some(v) = lookup("ENVMON_CSV_PATH") {
            self.persistence.csv_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ENVMON_HTTP_ENABLED") {
            self.dashboard.http_enabled = parse_flag("ENVMON_HTTP_ENABLED", &v)?;
        }
        if let Some(v) = lookup("ENVMON_HTTP_BIND") {
            self.dashboard.bind = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history.capacity == 0 {
            return Err(ConfigError::Invalid("history.capacity must be > 0".to_string()));
        }
        if self.history.ingest_queue_limit == 0 {
            return Err(ConfigError::Invalid("history.ingest_queue_limit must be > 0".to_string()));
        }
        if self.broker.port == 0 {
            return Err(ConfigError::Invalid("broker.port must be > 0".to_string()));
        }
        if self.broker.reconnect_delay_secs == 0 {
            return Err(ConfigError::Invalid("broker.reconnect_delay_secs must be > 0".to_string()));
        }
        if self.broker.host.trim().is_empty() {
            return Err(ConfigError::Invalid("broker.host is empty".to_string()));
        }
        if self.topics.sensor.trim().is_empty() || self.topics.output.trim().is_empty() {
            return Err(ConfigError::Invalid("topics must not be empty".to_string()));
        }
        if self.topics.sensor == self.topics.output {
            return Err(ConfigError::Invalid("sensor and output topics must differ".to_string()));
        }
        if self.dashboard.utc_offset_hours.abs() > 23 {
            return Err(ConfigError::Invalid("dashboard.utc_offset_hours out of range".to_string()));
        }
        if self.dashboard.refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid("dashboard.refresh_interval_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::labels::LabelKind;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::from_sources(None, env(&[])).unwrap();
        assert_eq!(config.broker.host, "broker.emqx.io");
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.topics.sensor, "Iot/IgniteLogic/sensor");
        assert_eq!(config.history.capacity, 5000);
        assert!(config.persistence.enabled);
        assert_eq!(config.dashboard.offset().local_minus_utc(), 7 * 3600);
        assert_eq!(config.commands.command_for(LabelKind::Unsafe), "LED_MERAH");
    }

    #[test]
    fn test_env_overrides() {
        let config = MonitorConfig::from_sources(
            None,
            env(&[
                ("ENVMON_BROKER_HOST", "localhost"),
                ("ENVMON_BROKER_PORT", "1884"),
                ("ENVMON_LOG_CAPACITY", "10"),
                ("ENVMON_CSV_ENABLED", "false"),
            ]),
        )
        .unwrap();
        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.broker.port, 1884);
        assert_eq!(config.history.capacity, 10);
        assert!(!config.persistence.enabled);
    }

    #[test]
    fn test_bad_env_value() {
        let result = MonitorConfig::from_sources(None, env(&[("ENVMON_BROKER_PORT", "abc")]));
        assert!(matches!(result, Err(ConfigError::Env { .. })));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = MonitorConfig::from_sources(None, env(&[("ENVMON_LOG_CAPACITY", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_reconnect_delay_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"broker": {"reconnect_delay_secs": 0}}"#).unwrap();

        let result = MonitorConfig::from_sources(Some(&path), env(&[]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let mut broker = BrokerConfig::default();
        broker.reconnect_delay_secs = 0;
        assert_eq!(broker.reconnect_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "topics": {"sensor": "lab/sensor"},
                "commands": {"commands": {"safe": "GREEN", "caution": "YELLOW", "unsafe": "RED"}, "fail_safe": "RED"}
            }"#,
        )
        .unwrap();

        let config = MonitorConfig::from_sources(Some(&path), env(&[])).unwrap();
        assert_eq!(config.topics.sensor, "lab/sensor");
        assert_eq!(config.topics.output, "Iot/IgniteLogic/output");
        assert_eq!(config.commands.command_for(LabelKind::Caution), "YELLOW");
        assert_eq!(config.commands.command_for(LabelKind::Error), "RED");
        assert_eq!(config.edge_labels.resolve("aman"), LabelKind::Safe);
    }

    #[test]
    fn test_unreadable_file() {
        let result = MonitorConfig::from_sources(Some(Path::new("/nonexistent/envmon.json")), env(&[]));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_same_topics_rejected() {
        let result = MonitorConfig::from_sources(
            None,
            env(&[("ENVMON_OUTPUT_TOPIC", "Iot/IgniteLogic/sensor")]),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
