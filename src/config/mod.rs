//! Dashboard configuration.
//!
//! Configuration is stored as TOML. Every field has a default so a missing
//! or partial file still yields a usable config.
//!
//! ```toml
//! base_url = "http://localhost:3000"
//! default_model = "deepseek-api"
//! storage_key = "everyday-ai-model"
//!
//! [registry]
//! path = "/api/models"
//! timeout_secs = 10
//!
//! [[registry.fallback]]
//! id = "deepseek-api"
//! description = "DeepSeek cloud API"
//!
//! [tools]
//! travel_timeout_secs = 60
//! ```

pub mod persist;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::capability::{Capability, CapabilityKind};
use crate::error::Error;

pub use persist::{read_config, write_config_atomic, write_text_atomic};

/// Environment variable that overrides [`DashboardConfig::base_url`] at load time.
pub const BASE_URL_ENV: &str = "EVERYDAY_AI_BASE_URL";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Origin of the backend serving the discovery and tool endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Capability id used before any registry response arrives, and the
    /// sentinel reconciliation falls back to when no remote capability exists.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Key under which the selection is persisted.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Discovery endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path of the discovery endpoint, relative to `base_url`.
    #[serde(default = "default_registry_path")]
    pub path: String,
    /// Maximum time in seconds to wait for the discovery response.
    #[serde(default = "default_registry_timeout_secs")]
    pub timeout_secs: u64,
    /// Capabilities offered when discovery fails.
    #[serde(default = "default_fallback")]
    pub fallback: Vec<FallbackCapability>,
}

/// A statically configured remote capability shown when discovery fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackCapability {
    pub id: String,
    #[serde(default)]
    pub description: String,
}

impl FallbackCapability {
    /// Fallback entries are always remote and assumed reachable.
    pub fn to_capability(&self) -> Capability {
        Capability::new(&self.id, CapabilityKind::Remote, true, &self.description)
    }
}

/// Per-tool request settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Deadline for travel itinerary generation.
    #[serde(default = "default_travel_timeout_secs")]
    pub travel_timeout_secs: u64,
    /// Optional deadline for email enhancement. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_timeout_secs: Option<u64>,
    /// Optional deadline for news curation. `None` waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_model() -> String {
    "deepseek-api".to_string()
}

fn default_storage_key() -> String {
    "everyday-ai-model".to_string()
}

fn default_registry_path() -> String {
    "/api/models".to_string()
}

fn default_registry_timeout_secs() -> u64 {
    10
}

fn default_fallback() -> Vec<FallbackCapability> {
    vec![FallbackCapability {
        id: default_model(),
        description: "DeepSeek cloud API".to_string(),
    }]
}

fn default_travel_timeout_secs() -> u64 {
    60
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_model: default_model(),
            storage_key: default_storage_key(),
            registry: RegistryConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
            timeout_secs: default_registry_timeout_secs(),
            fallback: default_fallback(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            travel_timeout_secs: default_travel_timeout_secs(),
            email_timeout_secs: None,
            news_timeout_secs: None,
        }
    }
}

impl DashboardConfig {
    /// Create a config pointing at a specific backend origin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the backend origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the default capability id.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the discovery timeout in seconds.
    pub fn with_registry_timeout_secs(mut self, secs: u64) -> Self {
        self.registry.timeout_secs = secs;
        self
    }

    /// Set the travel planning deadline in seconds.
    pub fn with_travel_timeout_secs(mut self, secs: u64) -> Self {
        self.tools.travel_timeout_secs = secs;
        self
    }

    /// Replace the fallback capability list.
    pub fn with_fallback(mut self, fallback: Vec<FallbackCapability>) -> Self {
        self.registry.fallback = fallback;
        self
    }

    /// Load, apply environment overrides, and validate.
    ///
    /// # Errors
    /// Returns `Error::Config` on read, parse, or validation failure.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let mut config = read_config(path)?;
        config.apply_env_overrides();
        validate_config(&config)?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    ///
    /// # Errors
    /// Returns `Error::Config` if the file exists but is invalid.
    pub fn load_or_default(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            let mut config = Self::default();
            config.apply_env_overrides();
            validate_config(&config)?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Persist atomically.
    ///
    /// # Errors
    /// Returns `Error::Config` on validation or write failure.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        validate_config(self)?;
        write_config_atomic(path, self)
    }

    fn apply_env_overrides(&mut self) {
        match std::env::var(BASE_URL_ENV) {
            Ok(base_url) if !base_url.trim().is_empty() => {
                tracing::debug!(base_url = %base_url, "base_url overridden from environment");
                self.base_url = base_url;
            }
            _ => {}
        }
    }

    /// Absolute URL for a path on the configured backend.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Absolute URL of the discovery endpoint.
    pub fn registry_url(&self) -> String {
        self.endpoint_url(&self.registry.path)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry.timeout_secs)
    }

    /// Fallback list as capabilities, in configured order.
    pub fn fallback_capabilities(&self) -> Vec<Capability> {
        self.registry
            .fallback
            .iter()
            .map(FallbackCapability::to_capability)
            .collect()
    }
}

/// Validate a config.
///
/// # Errors
/// Returns `Error::Config` describing the first problem found.
pub fn validate_config(config: &DashboardConfig) -> Result<(), Error> {
    let base = config.base_url.trim();
    if base.is_empty() {
        return Err(Error::Config("base_url must not be empty".into()));
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(Error::Config(format!(
            "base_url '{base}' must start with http:// or https://"
        )));
    }
    if !config.registry.path.starts_with('/') {
        return Err(Error::Config(format!(
            "registry.path '{}' must start with '/'",
            config.registry.path
        )));
    }
    if config.registry.timeout_secs == 0 {
        return Err(Error::Config("registry.timeout_secs must be positive".into()));
    }
    if config.tools.travel_timeout_secs == 0 {
        return Err(Error::Config(
            "tools.travel_timeout_secs must be positive".into(),
        ));
    }
    if config.tools.email_timeout_secs == Some(0) {
        return Err(Error::Config(
            "tools.email_timeout_secs must be positive".into(),
        ));
    }
    if config.tools.news_timeout_secs == Some(0) {
        return Err(Error::Config("tools.news_timeout_secs must be positive".into()));
    }
    if config.default_model.trim().is_empty() {
        return Err(Error::Config("default_model must not be empty".into()));
    }
    if config.storage_key.trim().is_empty() {
        return Err(Error::Config("storage_key must not be empty".into()));
    }
    if let Some(entry) = config.registry.fallback.iter().find(|f| f.id.trim().is_empty()) {
        return Err(Error::Config(format!(
            "registry.fallback entry with description '{}' has an empty id",
            entry.description
        )));
    }
    Ok(())
}
