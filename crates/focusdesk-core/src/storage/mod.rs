mod config;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod store;

pub use config::{Config, GoalsConfig, LoggingConfig, StatsConfig, StorageConfig, TimerConfig};
pub use database::Database;
pub use memory::MemoryStore;
pub use store::{SessionStore, TaskStore, UnitOfWork, Write};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/focusdesk[-dev]/` based on FOCUSDESK_ENV.
///
/// Set FOCUSDESK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSDESK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusdesk-dev")
    } else {
        base_dir.join("focusdesk")
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
