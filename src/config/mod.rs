// Configuration module for slowquery-recorder
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Default values

pub mod types;
mod loader;

pub use loader::ConfigLoader;
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<RecorderConfig> {
    let mut config = load_config(path)?;

    // Allow environment variables to override config values
    if let Ok(log_file) = std::env::var("SLOWQUERY_LOG_FILE") {
        config.storage.path = log_file.into();
    }

    if let Ok(socket) = std::env::var("SLOWQUERY_SOCKET") {
        config.collector.socket_path = socket.into();
    }

    if let Ok(value) = std::env::var("SLOWQUERY_MAX_FILE_SIZE_KB") {
        if let Ok(kb) = value.parse() {
            config.tracking.max_file_size_kb = kb;
        }
    }

    Ok(config)
}
