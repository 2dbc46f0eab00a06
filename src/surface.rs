//! Read model for the model picker.
//!
//! [`SelectorView`] is computed from a [`SelectionState`] and holds
//! everything a host needs to render the picker: the remote and local
//! groups, which entries may be chosen, loading and error state, and the
//! degraded-local notice. Rendering itself is up to the host.

use crate::capability::Capability;
use crate::error::Failure;
use crate::selection::SelectionState;

/// Label shown when the selected id is not in the visible list.
pub const PLACEHOLDER_LABEL: &str = "Select Model";

/// Notice shown when local capabilities are known but none is reachable.
pub const LOCAL_UNAVAILABLE_NOTICE: &str =
    "No local models available. Start Ollama to use local models.";

/// Coarse picker state, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorStatus {
    /// A registry fetch is in flight; interaction is disabled.
    Loading,
    /// The last fetch failed; the fallback list is shown.
    Failed,
    /// The registry answered with nothing.
    Empty,
    Ready,
}

/// Why a selection request was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorRejection {
    #[error("model list is still loading")]
    Busy,
    #[error("'{0}' is not offered by the model picker")]
    NotOffered(String),
    /// The choice was valid but could not be persisted; nothing changed.
    #[error("selection could not be saved: {0}")]
    NotSaved(String),
}

/// Snapshot of the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorView {
    current: String,
    remote: Vec<Capability>,
    local: Vec<Capability>,
    loading: bool,
    last_error: Option<Failure>,
    using_fallback: bool,
}

impl SelectorView {
    /// Build the view.
    ///
    /// When the last fetch failed and there is no earlier snapshot to show,
    /// `fallback` stands in for the registry so tools stay usable.
    pub fn from_state(state: &SelectionState, fallback: &[Capability]) -> Self {
        let using_fallback = state.last_error.is_some() && state.registry_snapshot.is_empty();
        let source = if using_fallback {
            fallback
        } else {
            state.registry_snapshot.as_slice()
        };

        let (remote, local): (Vec<Capability>, Vec<Capability>) =
            source.iter().cloned().partition(Capability::is_remote);

        Self {
            current: state.current.clone(),
            remote,
            local,
            loading: state.loading,
            last_error: state.last_error.clone(),
            using_fallback,
        }
    }

    /// The active capability id.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Remote capabilities, in registry order.
    pub fn remote(&self) -> &[Capability] {
        &self.remote
    }

    /// Local capabilities, in registry order, reachable or not.
    pub fn local(&self) -> &[Capability] {
        &self.local
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&Failure> {
        self.last_error.as_ref()
    }

    /// User-facing sentence for the last registry failure.
    pub fn error_message(&self) -> Option<String> {
        self.last_error.as_ref().map(Failure::user_message)
    }

    /// True when the configured fallback list is being shown.
    pub fn is_fallback(&self) -> bool {
        self.using_fallback
    }

    /// Local capabilities exist but none is available.
    pub fn local_degraded(&self) -> bool {
        !self.local.is_empty() && !self.local.iter().any(Capability::is_available)
    }

    pub fn degraded_notice(&self) -> Option<&'static str> {
        self.local_degraded().then_some(LOCAL_UNAVAILABLE_NOTICE)
    }

    /// Entries the user may pick: every remote capability plus the
    /// available local ones.
    pub fn offered(&self) -> impl Iterator<Item = &Capability> {
        self.remote
            .iter()
            .chain(self.local.iter().filter(|c| c.is_available()))
    }

    pub fn status(&self) -> SelectorStatus {
        if self.loading {
            SelectorStatus::Loading
        } else if self.last_error.is_some() {
            SelectorStatus::Failed
        } else if self.remote.is_empty() && self.local.is_empty() {
            SelectorStatus::Empty
        } else {
            SelectorStatus::Ready
        }
    }

    /// Display name of the selected capability, or [`PLACEHOLDER_LABEL`].
    pub fn display_label(&self) -> String {
        self.remote
            .iter()
            .chain(self.local.iter())
            .find(|c| c.id() == self.current)
            .map(|c| c.display_name().to_string())
            .unwrap_or_else(|| PLACEHOLDER_LABEL.to_string())
    }

    /// Check whether `id` may be selected right now.
    ///
    /// # Errors
    /// `Busy` while loading, `NotOffered` for ids outside [`offered`](Self::offered).
    pub fn check_request(&self, id: &str) -> Result<(), SelectorRejection> {
        if self.loading {
            return Err(SelectorRejection::Busy);
        }
        if !self.offered().any(|c| c.id() == id) {
            return Err(SelectorRejection::NotOffered(id.to_string()));
        }
        Ok(())
    }
}
