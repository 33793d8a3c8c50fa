//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Runtime overrides live in `logic::config`.

/// Default MQTT broker host
pub const DEFAULT_BROKER_HOST: &str = "broker.emqx.io";

/// Default MQTT broker port
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// MQTT keep-alive (seconds)
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;

/// Delay between reconnect attempts (seconds)
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;

/// Upper bound for a single broker connect attempt (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Prefix for generated MQTT client ids
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "envmon";

/// Topic the microcontroller publishes readings on
pub const DEFAULT_SENSOR_TOPIC: &str = "Iot/IgniteLogic/sensor";

/// Topic the actuation command is published on
pub const DEFAULT_OUTPUT_TOPIC: &str = "Iot/IgniteLogic/output";

/// Default ONNX model artifact
pub const DEFAULT_MODEL_PATH: &str = "model.onnx";

/// Default model schema metadata (feature order, light scale, classes)
pub const DEFAULT_MODEL_METADATA_PATH: &str = "model.json";

/// Default CSV mirror file
pub const DEFAULT_CSV_PATH: &str = "iot_sensor_data.csv";

/// Maximum records kept in the history log
pub const DEFAULT_LOG_CAPACITY: usize = 5000;

/// Maximum events waiting in the ingest queue before new ones are dropped
pub const DEFAULT_INGEST_QUEUE_LIMIT: usize = 100_000;

/// Consumer refresh cadence (milliseconds)
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2000;

/// Display timezone (hours east of UTC)
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 7;

/// Default bind address for the dashboard API
pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8501";

/// Full-scale value of the 12-bit light ADC; inverted light = ADC max - raw
pub const LIGHT_ADC_MAX: f64 = 4095.0;

/// Points served for the live chart
pub const CHART_POINTS: usize = 200;

/// Rows served for the recent-log table
pub const TABLE_ROWS: usize = 100;

/// Timestamp format used for display and the CSV mirror
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "EnvMon";

/// Environment variable pointing at a JSON config file
pub const CONFIG_PATH_ENV: &str = "ENVMON_CONFIG";
