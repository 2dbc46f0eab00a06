//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Config | `~/Library/Application Support/everyday-ai/` | `~/.config/everyday-ai/` |
//! | Data | `~/Library/Application Support/everyday-ai/` | `~/.local/share/everyday-ai/` |
//!
//! # Environment Overrides
//!
//! - `EVERYDAY_AI_CONFIG_DIR` — overrides [`config_dir`]
//! - `EVERYDAY_AI_DATA_DIR` — overrides [`data_dir`]

use std::path::PathBuf;

const APP_DIR_NAME: &str = "everyday-ai";

/// Application config directory.
///
/// Holds `config.toml` and the persisted selection.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("EVERYDAY_AI_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/everyday-ai-config"))
}

/// Application data root directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("EVERYDAY_AI_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("/tmp/everyday-ai-data"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Durable selection store path (`config_dir()/selection.json`).
#[must_use]
pub fn selection_file() -> PathBuf {
    config_dir().join("selection.json")
}
