//! SelectionStore — the single source of truth for the active capability.
//!
//! Holds the in-memory [`SelectionState`] behind a `RwLock` and mirrors the
//! chosen id into durable storage. The lock is only ever held for the
//! duration of a field update, never across an `.await`.
//!
//! Every write of `current` happens under `persist_lock` together with its
//! storage save, so storage and memory agree on the last writer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::capability::Capability;
use crate::error::{Error, Failure};

use super::reconcile::{Reconciliation, reconcile};
use super::storage::SelectionStorage;

/// In-memory selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    /// Active capability id.
    pub current: String,
    /// Capabilities from the last successful registry fetch, in response order.
    pub registry_snapshot: Vec<Capability>,
    /// True only while a registry fetch is in flight.
    pub loading: bool,
    /// Failure from the most recent registry fetch attempt, if it failed.
    pub last_error: Option<Failure>,
}

/// Store for the active capability id.
pub struct SelectionStore {
    storage: Box<dyn SelectionStorage>,
    key: String,
    default_id: String,
    state: RwLock<SelectionState>,
    /// Serializes storage saves with their in-memory update.
    persist_lock: Mutex<()>,
    /// Registry fetches begun and not yet settled. Guarded by `state`'s write lock.
    fetches_in_flight: AtomicUsize,
}

impl std::fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionStore")
            .field("key", &self.key)
            .field("default_id", &self.default_id)
            .field("state", &*self.read())
            .finish()
    }
}

impl SelectionStore {
    /// Create the store, seeding `current` from storage or `default_id`.
    ///
    /// A stored value that is blank, or storage that cannot be read, falls
    /// back to `default_id`.
    pub fn new(
        storage: Box<dyn SelectionStorage>,
        key: impl Into<String>,
        default_id: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let default_id = default_id.into();

        let current = match storage.load(&key) {
            Ok(Some(stored)) if !stored.trim().is_empty() => {
                tracing::debug!(model = %stored, "selection seeded from storage");
                stored
            }
            Ok(_) => default_id.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored selection, using default");
                default_id.clone()
            }
        };

        Self {
            storage,
            key,
            default_id,
            state: RwLock::new(SelectionState {
                current,
                registry_snapshot: Vec::new(),
                loading: false,
                last_error: None,
            }),
            persist_lock: Mutex::new(()),
            fetches_in_flight: AtomicUsize::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SelectionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SelectionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_persist(&self) -> MutexGuard<'_, ()> {
        self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settle one fetch; `loading` stays set while others are in flight.
    fn settle_fetch(&self, state: &mut SelectionState) {
        let remaining = self
            .fetches_in_flight
            .load(Ordering::Acquire)
            .saturating_sub(1);
        self.fetches_in_flight.store(remaining, Ordering::Release);
        state.loading = remaining > 0;
    }

    /// The active capability id.
    pub fn get_selection(&self) -> String {
        self.read().current.clone()
    }

    /// Persist `id`, then make it the active selection.
    ///
    /// No registry validation happens here; callers only offer ids from the
    /// snapshot. Concurrent writers are last-write-wins.
    ///
    /// # Errors
    /// Returns `Error::Storage` if persisting fails; `current` is unchanged.
    pub fn set_selection(&self, id: &str) -> Result<(), Error> {
        let _persist = self.lock_persist();
        self.storage.save(&self.key, id)?;
        let mut state = self.write();
        if state.current != id {
            tracing::info!(from = %state.current, to = %id, "selection changed");
        }
        state.current = id.to_string();
        Ok(())
    }

    /// The default sentinel id.
    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// Clone of the whole state.
    pub fn snapshot(&self) -> SelectionState {
        self.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn last_error(&self) -> Option<Failure> {
        self.read().last_error.clone()
    }

    pub fn registry_snapshot(&self) -> Vec<Capability> {
        self.read().registry_snapshot.clone()
    }

    /// Mark a registry fetch as in flight.
    ///
    /// Each call must be settled by exactly one of [`apply_registry`],
    /// [`apply_registry_failure`] or [`abandon_fetch`].
    ///
    /// [`apply_registry`]: Self::apply_registry
    /// [`apply_registry_failure`]: Self::apply_registry_failure
    /// [`abandon_fetch`]: Self::abandon_fetch
    pub fn begin_fetch(&self) {
        let mut state = self.write();
        self.fetches_in_flight.fetch_add(1, Ordering::AcqRel);
        state.loading = true;
    }

    /// Settle a fetch that ended without an outcome, e.g. because its
    /// future was dropped. Snapshot and `last_error` are left as they were.
    pub fn abandon_fetch(&self) {
        let mut state = self.write();
        self.settle_fetch(&mut state);
        tracing::debug!(loading = state.loading, "registry fetch abandoned");
    }

    /// Install a fresh snapshot and reconcile the selection against it.
    ///
    /// Clears `last_error`. If `current` is no longer offered it is reset
    /// (see [`reconcile`]) and the new id is written back to storage; a
    /// write-back failure is logged and the in-memory reset still applies.
    pub fn apply_registry(&self, capabilities: Vec<Capability>) -> Reconciliation {
        let _persist = self.lock_persist();
        let decision = {
            let mut state = self.write();
            let decision = reconcile(&state.current, &capabilities, &self.default_id);
            state.registry_snapshot = capabilities;
            self.settle_fetch(&mut state);
            state.last_error = None;
            if let Reconciliation::Reset(next) = &decision {
                tracing::info!(
                    from = %state.current,
                    to = %next,
                    "stored selection not offered by registry, resetting"
                );
                state.current = next.clone();
            }
            decision
        };

        if let Reconciliation::Reset(next) = &decision {
            if let Err(e) = self.storage.save(&self.key, next) {
                tracing::warn!(error = %e, "failed to persist reconciled selection");
            }
        }
        decision
    }

    /// Record a failed registry fetch. The previous snapshot is kept.
    pub fn apply_registry_failure(&self, failure: Failure) {
        let mut state = self.write();
        self.settle_fetch(&mut state);
        state.last_error = Some(failure);
    }
}
