use serde::Deserialize;
use std::str::FromStr;
use yolo_inference::config::{LabelsConfig, ModelConfig, Validatable};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub camera: CameraConfig,
    pub model: ModelConfig,
    pub labels: LabelsConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        self.model.validate()?;
        self.labels.validate()?;
        if !(1..=100).contains(&self.stream.jpeg_quality) {
            return Err(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.stream.jpeg_quality
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: i32,
}

/// Requested capture size. Devices may pick the closest mode they support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 480,
            height: 480,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: i32,
}

fn default_jpeg_quality() -> i32 {
    95
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

/// Selects the `configuration/<environment>.yaml` overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Environment::Local, Environment::Production]
            .into_iter()
            .find(|environment| environment.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unsupported environment `{}`, expected local or production", s)
            })
    }
}

/// Minimum level for this crate's events; `ort` stays at info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl LogLevel {
    const ALL: [LogLevel; 4] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unsupported log level `{}`, expected error, warn, info or debug", s)
            })
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!(
            "Failed to determine the current directory: {}",
            e
        ))
    })?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .parse()
        .map_err(config::ConfigError::Message)?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("WS")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    config.validate().map_err(|e| {
        config::ConfigError::Message(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    const BASE: &str = r#"
server:
  host: 127.0.0.1
  port: 5000
log_level: info
model:
  model_dir: models
  onnx_file: yolov8n.onnx
labels:
  labels_dir: configuration
  labels_file: coco_labels.txt
"#;

    fn load(overlay: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(BASE, FileFormat::Yaml))
            .add_source(File::from_str(overlay, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<Config>()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = load("{}");

        assert_eq!(config.server.get_address(), "127.0.0.1:5000");
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.camera.device_index, 0);
        assert_eq!(config.stream.jpeg_quality, 95);
        assert_eq!(config.model.target_classes, vec![0]);
        assert_eq!(Resolution::default(), Resolution { width: 480, height: 480 });
    }

    #[test]
    fn test_overlay_overrides_base() {
        let config = load(
            "log_level: DEBUG\ncamera:\n  device_index: 2\nstream:\n  jpeg_quality: 70\n",
        );

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.camera.device_index, 2);
        assert_eq!(config.stream.jpeg_quality, 70);
    }

    #[test]
    fn test_invalid_log_level() {
        let result = config::Config::builder()
            .add_source(File::from_str(BASE, FileFormat::Yaml))
            .add_source(File::from_str("log_level: trace", FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<Config>();

        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_missing_model() {
        let config = load("{}");

        let err = config.validate().unwrap_err();
        assert!(err.contains("yolov8n.onnx"));
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("Production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("local".parse::<Environment>(), Ok(Environment::Local));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("error".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert!("trace".parse::<LogLevel>().is_err());
    }
}
