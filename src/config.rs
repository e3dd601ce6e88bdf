//! Session configuration for TN3270R
//!
//! A [`SessionConfig`] names the host to connect to and tunes the session's
//! timing. It is stored as JSON; missing keys take their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::telnet_negotiation::DEFAULT_TERMINAL_TYPE;

/// Environment variable that overrides [`default_config_path`]
pub const CONFIG_ENV_VAR: &str = "TN3270R_CONFIG";

/// Well-known port for telnet over TLS
pub const TLS_PORT: u16 = 992;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Sent in TERMINAL-TYPE IS and the TN3270E device type request
    pub terminal_type: String,
    /// Re-check interval for text waits and keyboard-lock waits
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
    /// Socket read chunk size
    pub read_buffer_size: usize,
    /// Wrap the connection in TLS; unset means on for port 992 only
    pub use_tls: Option<bool>,
    /// Accept any server certificate
    pub tls_insecure: bool,
    /// PEM file of extra trusted CA certificates
    pub tls_ca_bundle_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 23,
            terminal_type: DEFAULT_TERMINAL_TYPE.to_string(),
            poll_interval_ms: 10,
            connect_timeout_ms: 10_000,
            read_buffer_size: 4096,
            use_tls: None,
            tls_insecure: false,
            tls_ca_bundle_path: None,
        }
    }
}

impl SessionConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            ..Self::default()
        }
    }

    /// Whether the connection is wrapped in TLS
    pub fn tls_enabled(&self) -> bool {
        self.use_tls.unwrap_or(self.port == TLS_PORT)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Reject values a session cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(invalid("port", "0", "port must be between 1 and 65535"));
        }
        if self.terminal_type.is_empty() || !self.terminal_type.is_ascii() {
            return Err(invalid(
                "terminal_type",
                &self.terminal_type,
                "terminal type must be non-empty ASCII",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "0", "poll interval must be positive"));
        }
        if self.read_buffer_size == 0 {
            return Err(invalid("read_buffer_size", "0", "read buffer must be positive"));
        }
        if let Some(path) = &self.tls_ca_bundle_path {
            if path.as_os_str().is_empty() {
                return Err(invalid("tls_ca_bundle_path", "", "CA bundle path must not be empty"));
            }
        }
        Ok(())
    }

    /// Parse a configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load and validate a configuration file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| file_error(path, e))?;
        let config = Self::from_json(&text).map_err(|e| file_error(path, e))?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| file_error(parent, e))?;
            }
        }
        let json = self.to_json().map_err(|e| file_error(path, e))?;
        fs::write(path, json).map_err(|e| file_error(path, e))?;
        debug!("Saved configuration to {}", path.display());
        Ok(())
    }
}

/// Default location of the configuration file.
///
/// `TN3270R_CONFIG` wins when set; otherwise `<config dir>/tn3270r/session.json`.
pub fn default_config_path() -> ConfigResult<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|base| base.join("tn3270r").join("session.json"))
        .ok_or(ConfigError::NoConfigDir)
}

fn invalid(parameter: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn file_error(path: &Path, error: impl std::fmt::Display) -> ConfigError {
    ConfigError::FileError {
        path: path.display().to_string(),
        error: error.to_string(),
    }
}
