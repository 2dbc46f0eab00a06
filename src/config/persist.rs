//! Atomic file operations for config and selection storage.
//!
//! Writes go temp file → fsync → rename so a crash mid-write never leaves a
//! truncated file behind.

use crate::error::Error;
use std::io::Write;
use std::path::Path;

use super::DashboardConfig;

/// Read a config file from disk and deserialize it.
///
/// # Errors
/// Returns `Error::Config` if the file cannot be read or parsed.
pub fn read_config(path: &Path) -> Result<DashboardConfig, Error> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "failed to read config file '{}': {e}",
            path.display()
        ))
    })?;
    toml::from_str(&contents).map_err(|e| {
        Error::Config(format!(
            "failed to parse config file '{}': {e}",
            path.display()
        ))
    })
}

/// Write a config file atomically.
///
/// # Errors
/// Returns `Error::Config` on serialization, write, or rename failure.
pub fn write_config_atomic(path: &Path, config: &DashboardConfig) -> Result<(), Error> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("failed to serialize config: {e}")))?;
    write_text_atomic(path, &toml_str).map_err(|e| Error::Config(e.to_string()))
}

/// Write text atomically (temp file → fsync → rename).
///
/// Parent directories are created as needed.
///
/// # Errors
/// Returns `Error::Io` if any filesystem step fails.
pub fn write_text_atomic(path: &Path, text: &str) -> Result<(), Error> {
    let tmp_path = path.with_extension("tmp");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(&tmp_path)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;

    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_dir() -> tempfile::TempDir {
        match tempfile::tempdir() {
            Ok(d) => d,
            Err(_) => unreachable!("tempdir creation should not fail"),
        }
    }

    #[test]
    fn write_and_read_config() {
        let dir = make_test_dir();
        let path = dir.path().join("config.toml");

        let config = DashboardConfig::default()
            .with_base_url("https://dashboard.example.com")
            .with_travel_timeout_secs(90);

        assert!(write_config_atomic(&path, &config).is_ok());
        assert!(path.exists());

        let loaded = read_config(&path).unwrap_or_default();
        assert_eq!(loaded.base_url, "https://dashboard.example.com");
        assert_eq!(loaded.tools.travel_timeout_secs, 90);
        assert_eq!(loaded.registry.fallback.len(), 1);
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = make_test_dir();
        let path = dir.path().join("nested").join("deeper").join("file.json");

        assert!(write_text_atomic(&path, "{}").is_ok());
        assert_eq!(std::fs::read_to_string(&path).unwrap_or_default(), "{}");
    }

    #[test]
    fn write_atomic_leaves_no_temp_file() {
        let dir = make_test_dir();
        let path = dir.path().join("selection.json");

        assert!(write_text_atomic(&path, "{\"a\":\"b\"}").is_ok());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn read_config_not_found() {
        let dir = make_test_dir();
        let result = read_config(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn read_config_invalid_toml() {
        let dir = make_test_dir();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "{{{{not valid toml!!!!").unwrap_or_default();
        assert!(read_config(&path).is_err());
    }
}
