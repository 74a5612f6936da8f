//! Runtime configuration, loaded from a TOML file.
//!
//! Every section falls back to its defaults, so a partial file (or no file at
//! all) still yields a usable configuration for a bench setup.

use crate::cycle::aggregator::WINDOW_SIZE;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub device: DeviceConfig,
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub classifier: ClassifierConfig,
    pub telegram: TelegramConfig,
    pub thingspeak: ThingSpeakConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DeviceConfig {
    pub path: PathBuf,
    pub baud_rate: u32,
    /// Capacity of the reader -> controller channel.
    pub channel_capacity: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/dev/ttyUSB0"),
            baud_rate: 9600,
            channel_capacity: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct WindowConfig {
    pub size: usize,
    /// Give up after this many unresolved windows. Unlimited when absent.
    pub max_windows: Option<u32>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: WINDOW_SIZE,
            max_windows: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CameraConfig {
    pub url: String,
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "http://192.168.10.225/cam-hi.jpg".to_string(),
            snapshot_path: Some(PathBuf::from("detected_waste.jpg")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ClassifierConfig {
    pub url: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000/classify".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TelegramConfig {
    pub api_base: String,
    pub token: String,
    pub chat_id: String,
    /// Appended to every alert so the collection crew can find the bin.
    pub location: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            token: String::new(),
            chat_id: String::new(),
            location: "https://maps.app.goo.gl/S1mBNRsD4z28P4rc7".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ThingSpeakConfig {
    pub url: String,
    pub write_api_key: String,
    pub field: String,
}

impl Default for ThingSpeakConfig {
    fn default() -> Self {
        Self {
            url: "https://api.thingspeak.com/update".to_string(),
            write_api_key: String::new(),
            field: "field1".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct HttpConfig {
    /// No timeout when absent: a hung endpoint stalls until interrupted.
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.device.path.as_os_str().is_empty() {
            errors.push("device.path must not be empty".to_string());
        }
        if self.device.channel_capacity == 0 {
            errors.push("device.channel_capacity must be > 0".to_string());
        }
        if self.window.size == 0 {
            errors.push("window.size must be > 0".to_string());
        }
        if self.window.max_windows == Some(0) {
            errors.push("window.max_windows must be > 0 when set".to_string());
        }
        for (key, url) in [
            ("camera.url", &self.camera.url),
            ("classifier.url", &self.classifier.url),
            ("telegram.api_base", &self.telegram.api_base),
            ("thingspeak.url", &self.thingspeak.url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                errors.push(format!("{key} must start with http:// or https://"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
