//! Everyday AI: model selection and resilient requests for the dashboard tools.
//!
//! The dashboard offers three AI-assisted tools (email rewriting, travel
//! planning, news curation). This crate owns the part they share:
//!
//! ```text
//! Registry → Selection Store → Selector Surface
//!                   ↓
//!            Request Pipeline → tool endpoint
//! ```
//!
//! - **Registry**: discovers which models the backend offers, once per session
//! - **Selection**: the active model id, persisted and reconciled against
//!   the registry
//! - **Surface**: the picker's read model and selection rules
//! - **Pipeline**: one POST per tool call with deadline, cancellation and a
//!   classified, humanized failure
//!
//! A host constructs a [`Session`] and drives everything through it.

pub mod app_dirs;
pub mod capability;
pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod registry;
pub mod selection;
pub mod session;
pub mod surface;
pub mod tools;
pub mod transport;

pub use capability::{Capability, CapabilityKind};
pub use config::DashboardConfig;
pub use error::{Error, ErrorCategory, Failure, Result};
pub use pipeline::{RequestOptions, RequestPipeline, ToolContext};
pub use selection::{FileStorage, MemoryStorage, SelectionStorage, SelectionStore};
pub use session::Session;
pub use surface::{SelectorRejection, SelectorStatus, SelectorView};
pub use tools::{EmailRequest, NewsRequest, TravelRequest};
pub use transport::{HttpTransport, ReqwestTransport};
