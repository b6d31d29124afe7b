mod config;

pub use config::{Config, SearchConfig, SlotsConfig, StoreConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/meetplan[-dev]/` based on MEETPLAN_ENV.
///
/// Set MEETPLAN_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MEETPLAN_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("meetplan-dev")
    } else {
        base_dir.join("meetplan")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
