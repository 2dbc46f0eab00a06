//! Reconciling the stored selection against a fresh registry snapshot.

use crate::capability::Capability;

/// What reconciliation decided for the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The current id is in the snapshot; nothing changes.
    Keep,
    /// The current id is gone; switch to this id and persist it.
    Reset(String),
}

/// Decide whether `current` survives a new snapshot.
///
/// # Decision Logic
///
/// - `current` present in the snapshot → `Keep`
/// - otherwise → `Reset(first remote capability)`
/// - no remote capability → `Reset(default_id)`, unless `current` already
///   equals `default_id`, which is `Keep`
///
/// A local capability is never chosen as the fallback, even when it is
/// available.
///
/// # Examples
///
/// ```
/// use everyday_ai::capability::{Capability, CapabilityKind};
/// use everyday_ai::selection::{Reconciliation, reconcile};
///
/// let snapshot = vec![
///     Capability::new("local-llama3", CapabilityKind::Local, true, ""),
///     Capability::new("deepseek-api", CapabilityKind::Remote, true, ""),
/// ];
/// assert_eq!(reconcile("local-llama3", &snapshot, "deepseek-api"), Reconciliation::Keep);
/// assert_eq!(
///     reconcile("gone-model", &snapshot, "deepseek-api"),
///     Reconciliation::Reset("deepseek-api".into())
/// );
/// ```
pub fn reconcile(current: &str, snapshot: &[Capability], default_id: &str) -> Reconciliation {
    if snapshot.iter().any(|c| c.id() == current) {
        return Reconciliation::Keep;
    }

    let fallback = snapshot
        .iter()
        .find(|c| c.is_remote())
        .map(Capability::id)
        .unwrap_or(default_id);

    if fallback == current {
        Reconciliation::Keep
    } else {
        Reconciliation::Reset(fallback.to_string())
    }
}
