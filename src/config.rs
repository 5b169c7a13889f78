//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. The path given with `--config`
//! 2. `~/.config/ewsharvest/config.toml` (Linux/macOS)
//!    `%APPDATA%\ewsharvest\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The raw [`Config`] is resolved once into [`Settings`], which is what the
//! rest of the crate receives.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};
use crate::harvest::filter::ExtensionFilter;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Exchange server settings.
    pub server: ServerConfig,
    /// Attachment harvesting policy.
    pub harvest: HarvestConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Also append logs to `ewsharvest.log` in the cache directory.
    pub log_to_file: bool,
}

/// Exchange server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// EWS host name, or a full base URL including the scheme.
    pub host: String,
}

/// Attachment harvesting policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// File extensions that are downloaded (without the dot).
    pub allowed_extensions: Vec<String>,
    /// Also store messages attached to other messages.
    pub download_attached_emails: bool,
    /// Root directory for stored artifacts.
    pub download_root: PathBuf,
    /// Retention window in seconds (default: 7776000 = 90 days).
    pub retention_seconds: u64,
    /// IANA timezone used for the retention boundary.
    pub timezone: String,
    /// Restrict enumeration to items received after the retention boundary.
    /// Off by default: the whole inbox is visited.
    pub apply_retention_filter: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
            log_to_file: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "outlook.office365.com".to_string(),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: ["pdf", "doc", "docx", "xls", "xlsm", "xlsx", "ppt", "pptx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            download_attached_emails: false,
            download_root: PathBuf::from("/tmp/ms-attachments"),
            retention_seconds: 60 * 60 * 24 * 90, // 90 days
            timezone: "Asia/Singapore".to_string(),
            apply_retention_filter: false,
        }
    }
}

// ── Resolved settings ───────────────────────────────────────────

/// Validated, read-only settings shared by every component of a run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Full EWS service URL.
    pub endpoint: String,
    /// Normalized extension allow-list.
    pub extensions: ExtensionFilter,
    /// Store embedded messages as artifacts.
    pub download_attached_emails: bool,
    /// Root directory for stored artifacts.
    pub download_root: PathBuf,
    /// Trailing retention window.
    pub retention: Duration,
    /// Timezone the retention boundary is expressed in.
    pub timezone: Tz,
    /// Whether the retention boundary restricts enumeration.
    pub apply_retention_filter: bool,
}

impl Config {
    /// Validate the configuration and resolve it into [`Settings`].
    pub fn settings(&self) -> Result<Settings> {
        let timezone: Tz = self.harvest.timezone.parse().map_err(|e| {
            HarvestError::Config(format!(
                "unknown timezone '{}': {e}",
                self.harvest.timezone
            ))
        })?;

        if self.harvest.download_root.as_os_str().is_empty() {
            return Err(HarvestError::Config(
                "harvest.download_root must not be empty".to_string(),
            ));
        }

        Ok(Settings {
            endpoint: service_endpoint(&self.server.host)?,
            extensions: ExtensionFilter::new(&self.harvest.allowed_extensions),
            download_attached_emails: self.harvest.download_attached_emails,
            download_root: self.harvest.download_root.clone(),
            retention: Duration::from_secs(self.harvest.retention_seconds),
            timezone,
            apply_retention_filter: self.harvest.apply_retention_filter,
        })
    }
}

/// Build the EWS service URL for a host.
///
/// A bare host becomes `https://{host}/EWS/Exchange.asmx`; a value that
/// already has an `http(s)://` scheme is used as the base URL.
pub fn service_endpoint(host: &str) -> Result<String> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(HarvestError::Config(
            "server.host must not be empty".to_string(),
        ));
    }
    if host.starts_with("https://") || host.starts_with("http://") {
        Ok(format!("{host}/EWS/Exchange.asmx"))
    } else {
        Ok(format!("https://{host}/EWS/Exchange.asmx"))
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration.
///
/// An explicit path must exist and parse. Otherwise the standard location is
/// tried, and defaults are used if it is missing or cannot be parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        let contents =
            std::fs::read_to_string(path).map_err(|e| HarvestError::io(path, e))?;
        let cfg = toml::from_str::<Config>(&contents)
            .map_err(|e| HarvestError::Config(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "Loaded config");
        return Ok(cfg);
    }

    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return Ok(cfg);
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Ok(Config::default())
}

/// Determine the standard config file path.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ewsharvest").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ewsharvest")
}
