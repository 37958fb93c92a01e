//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, and merging them into an [`ExporterConfig`].
//! Precedence, lowest first: built-in defaults, configuration file,
//! `DE_*` environment variables, command-line flags (applied by the binary).

use crate::error::ExporterError;
use crate::protocols::whois::{DEFAULT_COMMAND, DEFAULT_TIMEOUT};
use crate::utils::resolve_listen_address;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_LISTEN_ADDRESS: &str = ":80";

/// Longest accepted lookup deadline.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration loaded from TOML files.
///
/// ```toml
/// [server]
/// listen_address = "localhost:9203"
///
/// [probe]
/// timeout = "5s"
/// whois_command = "whois"
/// whois_server = "whois.tcinet.ru"
/// strip_www = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerSection {
    /// Bind address in `host:port` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProbeSection {
    /// Lookup deadline (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Program used for lookups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_command: Option<String>,

    /// Server passed as `-h <server>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_server: Option<String>,

    /// Strip a leading `www.` from targets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_www: Option<bool>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<FileConfig, ExporterError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ExporterError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ExporterError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        validate_file_config(&config)?;

        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Load the first configuration file found in the standard locations.
    ///
    /// Returns an empty configuration when none exists.
    pub fn discover_and_load() -> Result<FileConfig, ExporterError> {
        match Self::discover() {
            Some(path) => Self::load_file(path),
            None => Ok(FileConfig::default()),
        }
    }

    fn discover() -> Option<PathBuf> {
        let local = ["./domain-exporter.toml", "./.domain-exporter.toml"]
            .iter()
            .map(PathBuf::from);

        let xdg = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))
            .map(|dir| dir.join("domain-exporter").join("config.toml"));

        local.chain(xdg).find(|path| path.exists())
    }
}

/// Validate a configuration file for common issues.
fn validate_file_config(config: &FileConfig) -> Result<(), ExporterError> {
    if let Some(address) = config
        .server
        .as_ref()
        .and_then(|server| server.listen_address.as_deref())
    {
        resolve_listen_address(address)?;
    }

    if let Some(probe) = &config.probe {
        if let Some(timeout_str) = &probe.timeout {
            parse_timeout(timeout_str)?;
        }

        if matches!(&probe.whois_command, Some(command) if command.trim().is_empty()) {
            return Err(ExporterError::config("whois_command cannot be empty"));
        }
    }

    Ok(())
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via DE_* environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub listen_address: Option<String>,
    pub timeout: Option<Duration>,
    pub whois_command: Option<String>,
    pub whois_server: Option<String>,
    pub strip_www: Option<bool>,
    pub debug: Option<bool>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`], reading variables through `lookup`.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(address) = lookup("DE_LISTEN_ADDRESS") {
        match resolve_listen_address(&address) {
            Ok(_) => env_config.listen_address = Some(address),
            Err(e) => warn!("Ignoring DE_LISTEN_ADDRESS='{}': {}", address, e),
        }
    }

    if let Some(timeout_str) = lookup("DE_TIMEOUT") {
        match parse_timeout(&timeout_str) {
            Ok(timeout) => env_config.timeout = Some(timeout),
            Err(e) => warn!("Ignoring DE_TIMEOUT='{}': {}", timeout_str, e),
        }
    }

    if let Some(command) = lookup("DE_WHOIS_COMMAND") {
        if !command.trim().is_empty() {
            env_config.whois_command = Some(command.trim().to_string());
        }
    }

    if let Some(server) = lookup("DE_WHOIS_SERVER") {
        if !server.trim().is_empty() {
            env_config.whois_server = Some(server.trim().to_string());
        }
    }

    if let Some(val) = lookup("DE_STRIP_WWW") {
        match parse_bool(&val) {
            Some(flag) => env_config.strip_www = Some(flag),
            None => warn!("Ignoring DE_STRIP_WWW='{}', use true/false", val),
        }
    }

    if let Some(val) = lookup("DE_DEBUG") {
        match parse_bool(&val) {
            Some(flag) => env_config.debug = Some(flag),
            None => warn!("Ignoring DE_DEBUG='{}', use true/false", val),
        }
    }

    if let Some(path) = lookup("DE_CONFIG") {
        if !path.trim().is_empty() {
            env_config.config = Some(path);
        }
    }

    env_config
}

/// Effective settings for the server and its probes.
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub listen_address: String,
    pub timeout: Duration,
    pub whois_command: String,
    pub whois_server: Option<String>,
    pub strip_www: bool,
    pub debug: bool,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            timeout: DEFAULT_TIMEOUT,
            whois_command: DEFAULT_COMMAND.to_string(),
            whois_server: None,
            strip_www: true,
            debug: false,
        }
    }
}

impl ExporterConfig {
    /// Overlay values from a configuration file.
    ///
    /// The file is expected to have passed validation in
    /// [`ConfigManager::load_file`].
    pub fn apply_file(mut self, file: &FileConfig) -> Result<Self, ExporterError> {
        if let Some(server) = &file.server {
            if let Some(address) = &server.listen_address {
                self.listen_address = address.clone();
            }
        }

        if let Some(probe) = &file.probe {
            if let Some(timeout_str) = &probe.timeout {
                self.timeout = parse_timeout(timeout_str)?;
            }
            if let Some(command) = &probe.whois_command {
                self.whois_command = command.clone();
            }
            if probe.whois_server.is_some() {
                self.whois_server = probe.whois_server.clone();
            }
            if let Some(strip_www) = probe.strip_www {
                self.strip_www = strip_www;
            }
        }

        Ok(self)
    }

    /// Overlay values from environment variables.
    pub fn apply_env(mut self, env_config: &EnvConfig) -> Self {
        if let Some(address) = &env_config.listen_address {
            self.listen_address = address.clone();
        }
        if let Some(timeout) = env_config.timeout {
            self.timeout = timeout;
        }
        if let Some(command) = &env_config.whois_command {
            self.whois_command = command.clone();
        }
        if env_config.whois_server.is_some() {
            self.whois_server = env_config.whois_server.clone();
        }
        if let Some(strip_www) = env_config.strip_www {
            self.strip_www = strip_www;
        }
        if let Some(debug) = env_config.debug {
            self.debug = debug;
        }
        self
    }
}

/// Parse a timeout string like "5s", "30s", "2m" into a duration.
///
/// Bare numbers are seconds. The result must be within 1s..=5m.
pub fn parse_timeout(timeout_str: &str) -> Result<Duration, ExporterError> {
    let seconds = parse_timeout_string(timeout_str).ok_or_else(|| {
        ExporterError::config(format!(
            "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
            timeout_str
        ))
    })?;

    let timeout = Duration::from_secs(seconds);
    if timeout.is_zero() || timeout > MAX_TIMEOUT {
        return Err(ExporterError::config(format!(
            "Timeout '{}' must be between 1s and 5m",
            timeout_str
        )));
    }

    Ok(timeout)
}

fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(seconds) = timeout_str.strip_suffix('s') {
        seconds.parse::<u64>().ok()
    } else if let Some(minutes) = timeout_str.strip_suffix('m') {
        minutes.parse::<u64>().ok().map(|m| m * 60)
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
