//! Configuration management for discenc.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Encode options with crop/autocrop precedence taken from the file's key order
//!
//! # Example
//!
//! ```no_run
//! use discenc_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/discenc.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Preferred language: {}", config.settings().selection.lang);
//!
//! config.settings_mut().encode.bitrate_sd = 1500;
//! config.update_section(ConfigSection::Encode).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, EncodeSettings, LoggingSettings, NormalizeSettings, PathSettings,
    ScanSettings, SelectionSettings, Settings, ToolSettings,
};
