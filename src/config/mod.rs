use crate::error::{BridgeError, Result};
use crate::ipc::client::DEFAULT_SOCKET_PATH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bridge configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Tags appended to every emission, either as a JSON-serialized array or a list
    #[serde(default)]
    pub global_tags: Option<GlobalTags>,

    /// DogStatsD agent host
    #[serde(default = "default_host")]
    pub host: String,

    /// DogStatsD agent port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Delay between poll cycles (in milliseconds)
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Process manager daemon socket
    #[serde(default = "default_socket")]
    pub socket: PathBuf,
}

/// `global_tags` as written in a config file or passed on the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GlobalTags {
    /// JSON-serialized array, as process manager module options deliver it
    Serialized(String),
    List(Vec<String>),
}

// Default value functions for serde
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8125
}

fn default_interval() -> u64 {
    10_000
}

fn default_socket() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            global_tags: None,
            host: default_host(),
            port: default_port(),
            interval: default_interval(),
            socket: default_socket(),
        }
    }
}

/// Values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub global_tags: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub interval: Option<u64>,
    pub socket: Option<PathBuf>,
}

impl BridgeConfig {
    /// Defaults, then the optional file, then overrides. The result is validated.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .map_err(|e| BridgeError::InvalidConfig(format!("Failed to parse TOML: {}", e))),
            "json" => serde_json::from_str(&contents)
                .map_err(|e| BridgeError::InvalidConfig(format!("Failed to parse JSON: {}", e))),
            _ => Err(BridgeError::InvalidConfig(format!(
                "Unsupported file format: {}. Use .toml or .json",
                extension
            ))),
        }
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(global_tags) = overrides.global_tags {
            self.global_tags = Some(GlobalTags::Serialized(global_tags));
        }
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(interval) = overrides.interval {
            self.interval = interval;
        }
        if let Some(socket) = overrides.socket {
            self.socket = socket;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BridgeError::ConfigValidationError(
                "host cannot be empty".to_string(),
            ));
        }

        if self.port == 0 {
            return Err(BridgeError::ConfigValidationError(
                "port must be greater than 0".to_string(),
            ));
        }

        if self.interval == 0 {
            return Err(BridgeError::ConfigValidationError(
                "interval must be greater than 0".to_string(),
            ));
        }

        if self.socket.as_os_str().is_empty() {
            return Err(BridgeError::ConfigValidationError(
                "socket cannot be empty".to_string(),
            ));
        }

        // Bad tags would corrupt every emission
        self.global_tags()?;

        Ok(())
    }

    /// Flattened global tags
    pub fn global_tags(&self) -> Result<Vec<String>> {
        match &self.global_tags {
            None => Ok(Vec::new()),
            Some(GlobalTags::Serialized(raw)) => parse_global_tags(raw),
            Some(GlobalTags::List(tags)) => Ok(tags.clone()),
        }
    }

    /// Poll delay as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }
}

/// Parse a JSON-serialized array of tag strings. Blank input means no tags.
pub fn parse_global_tags(raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| BridgeError::InvalidGlobalTags(format!("not valid JSON: {}", e)))?;

    let items = value.as_array().ok_or_else(|| {
        BridgeError::InvalidGlobalTags(format!("expected a JSON array, got: {}", raw))
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                BridgeError::InvalidGlobalTags(format!("tag is not a string: {}", item))
            })
        })
        .collect()
}
