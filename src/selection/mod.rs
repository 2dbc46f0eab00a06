//! Active capability selection.
//!
//! - [`SelectionStore`] owns the in-memory state and persists the chosen id.
//! - [`SelectionStorage`] is the durable key/value seam, with [`FileStorage`]
//!   and [`MemoryStorage`] implementations.
//! - [`reconcile`] decides what happens to the selection when a new registry
//!   snapshot arrives.

pub mod reconcile;
pub mod storage;
pub mod store;

pub use reconcile::{Reconciliation, reconcile};
pub use storage::{FileStorage, MemoryStorage, SelectionStorage};
pub use store::{SelectionState, SelectionStore};
