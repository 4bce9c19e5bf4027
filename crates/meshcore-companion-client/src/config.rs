//! Client configuration, loaded from YAML.
//!
//! ```yaml
//! default_timeout_ms: 5000
//! app_name: mccli
//! debug: true
//! tcp:
//!   host: 192.168.1.20
//!   port: 5000
//! ```

use std::path::Path;
use std::time::Duration;

use meshcore_companion_protocol::{APP_PROTOCOL_VERSION, MAX_FRAME_LEN};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_timeout_ms() -> u64 {
    5000
}

fn default_app_name() -> String {
    "mccli".to_string()
}

fn default_app_version() -> u8 {
    APP_PROTOCOL_VERSION
}

fn default_max_frame_len() -> usize {
    MAX_FRAME_LEN
}

fn default_auto_fetch_delay_ms() -> u64 {
    100
}

fn default_message_timeout_ms() -> u64 {
    1000
}

fn default_tcp_port() -> u16 {
    5000
}

/// TCP link to a companion radio (WiFi firmware or a serial bridge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpConfig {
    pub host: String,
    #[serde(default = "default_tcp_port")]
    pub port: u16,
}

impl TcpConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Engine settings. Every field has a default, so an empty document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Response timeout for commands that do not give their own.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Name announced in APP_START.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_app_version")]
    pub app_version: u8,

    /// Largest payload length accepted before a header is treated as corrupt.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,

    /// Pause before draining the queue after MESSAGES_WAITING.
    #[serde(default = "default_auto_fetch_delay_ms")]
    pub auto_fetch_delay_ms: u64,

    /// Timeout of each `get_msg` call.
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,

    /// Enable debug logging for the engine.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub tcp: Option<TcpConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            default_timeout_ms: default_timeout_ms(),
            app_name: default_app_name(),
            app_version: default_app_version(),
            max_frame_len: default_max_frame_len(),
            auto_fetch_delay_ms: default_auto_fetch_delay_ms(),
            message_timeout_ms: default_message_timeout_ms(),
            debug: false,
            tcp: None,
        }
    }
}

impl ClientConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn auto_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.auto_fetch_delay_ms)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    /// Log filter directive matching the `debug` flag.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "meshcore_companion_protocol=debug,meshcore_companion_client=debug"
        } else {
            "info"
        }
    }
}
