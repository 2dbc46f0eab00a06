//! Capability model: one selectable backend model or service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a capability runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    /// Cloud-hosted, assumed reachable.
    #[serde(rename = "cloud")]
    Remote,
    /// On-device or self-hosted; reachability reported by the registry.
    #[serde(rename = "local")]
    Local,
}

impl CapabilityKind {
    /// Parse the discovery wire value (`"cloud"` / `"local"`).
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "cloud" => Some(Self::Remote),
            "local" => Some(Self::Local),
            _ => None,
        }
    }

    /// The discovery wire value.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Remote => "cloud",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One invocable backend model.
///
/// The id never changes after construction and availability only changes by
/// fetching the registry again, so there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    id: String,
    display_name: String,
    description: String,
    kind: CapabilityKind,
    available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requires: Option<String>,
}

impl Capability {
    /// Create a capability. The display name is derived from the id.
    pub fn new(
        id: impl Into<String>,
        kind: CapabilityKind,
        available: bool,
        description: impl Into<String>,
    ) -> Self {
        let id = id.into();
        let display_name = display_name_for(&id);
        Self {
            id,
            display_name,
            description: description.into(),
            kind,
            available,
            requires: None,
        }
    }

    /// Attach the registry's prerequisite note.
    pub fn with_requires(mut self, requires: impl Into<String>) -> Self {
        self.requires = Some(requires.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn requires(&self) -> Option<&str> {
        self.requires.as_deref()
    }

    pub fn is_remote(&self) -> bool {
        self.kind == CapabilityKind::Remote
    }

    pub fn is_local(&self) -> bool {
        self.kind == CapabilityKind::Local
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.kind)
    }
}

/// Title-case each hyphen-delimited segment and join with spaces.
///
/// `"deepseek-api"` becomes `"Deepseek Api"`. Empty segments are dropped.
pub fn display_name_for(id: &str) -> String {
    id.split('-')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
