//! # sirenscan common library
//!
//! Shared code for the sirenscan binaries:
//! - Error and result types
//! - Bootstrap configuration (TOML + defaults)
//! - Scan resource limits

pub mod config;
pub mod error;

pub use config::{LoggingConfig, ScanLimits, TomlConfig};
pub use error::{Error, Result};
