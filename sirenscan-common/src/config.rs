//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (applied by each binary after loading)
//! 2. TOML config file
//! 3. Compiled defaults
//!
//! A missing TOML file at the default location is not an error; the
//! binaries start with defaults and log a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Directory name used under the platform config directory
const CONFIG_DIR_NAME: &str = "sirenscan";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a compiled default, so an empty file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Interface address for the HTTP server
    pub bind: String,

    /// HTTP server port
    pub port: u16,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Resource budgets applied to every scan
    pub limits: ScanLimits,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5790,
            logging: LoggingConfig::default(),
            limits: ScanLimits::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    ///
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Upper bounds for a single scan
///
/// Uploaded archives are untrusted input; these budgets keep zip bombs and
/// pathological markup from exhausting disk, memory or time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLimits {
    /// Maximum request body size for an upload
    pub max_upload_bytes: u64,

    /// Maximum total bytes written while unpacking one archive
    pub max_extracted_bytes: u64,

    /// Maximum number of entries in one archive
    pub max_archive_entries: usize,

    /// Metadata files larger than this are skipped
    pub max_meta_file_bytes: u64,

    /// Markup documents with more nodes than this fail to parse
    pub max_xml_nodes: u32,

    /// Wall-clock budget for one scan, in seconds
    pub scan_timeout_secs: u64,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 256 * 1024 * 1024,
            max_extracted_bytes: 1024 * 1024 * 1024,
            max_archive_entries: 50_000,
            max_meta_file_bytes: 16 * 1024 * 1024,
            max_xml_nodes: 1_000_000,
            scan_timeout_secs: 120,
        }
    }
}

impl ScanLimits {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    /// Check that every budget is usable
    pub fn validate(&self) -> Result<()> {
        let zeroes = [
            ("max_upload_bytes", self.max_upload_bytes == 0),
            ("max_extracted_bytes", self.max_extracted_bytes == 0),
            ("max_archive_entries", self.max_archive_entries == 0),
            ("max_meta_file_bytes", self.max_meta_file_bytes == 0),
            ("max_xml_nodes", self.max_xml_nodes == 0),
            ("scan_timeout_secs", self.scan_timeout_secs == 0),
        ];

        match zeroes.iter().find(|(_, is_zero)| *is_zero) {
            Some((name, _)) => Err(Error::Config(format!("limits.{} must be greater than 0", name))),
            None => Ok(()),
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file
    File(PathBuf),
    /// No file found; compiled defaults in use
    Defaults,
}

impl TomlConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.limits.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when no file exists
    ///
    /// An explicit path must exist. Without one, the platform default
    /// location is tried; if nothing is there the compiled defaults are
    /// returned.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok((Self::load(path)?, ConfigSource::File(path.to_path_buf())));
        }

        match find_default_config_file() {
            Some(path) => {
                debug!("Using config file {}", path.display());
                let config = Self::load(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }
}

/// Platform default config file path (may not exist)
///
/// `~/.config/sirenscan/config.toml` on Linux, the equivalent per-user config
/// directory elsewhere.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// First existing config file among the default locations
fn find_default_config_file() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = default_config_path().into_iter().collect();
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    }
    candidates.into_iter().find(|p| p.is_file())
}
