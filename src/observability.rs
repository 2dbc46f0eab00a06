//! Structured tracing spans and subscriber setup.
//!
//! Span names are dot-separated and stable:
//!
//! ```text
//! everyday_ai.registry.fetch
//! everyday_ai.pipeline.execute
//! ```
//!
//! Raw backend bodies are only ever logged at `debug` level.

use tracing_subscriber::EnvFilter;

/// Span for one discovery request.
pub const SPAN_REGISTRY_FETCH: &str = "everyday_ai.registry.fetch";

/// Span for one tool request through the pipeline.
pub const SPAN_PIPELINE_EXECUTE: &str = "everyday_ai.pipeline.execute";

/// Tool context field (`email`, `travel`, `news`).
pub const FIELD_TOOL: &str = "tool";

/// Capability id field.
pub const FIELD_MODEL: &str = "model";

/// Request identifier field (UUID v4).
pub const FIELD_REQUEST_ID: &str = "request_id";

/// Target URL field.
pub const FIELD_URL: &str = "url";

/// Install a stderr `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"info"` or
/// `"everyday_ai=debug"`) is used. Returns `false` if a global subscriber
/// was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
