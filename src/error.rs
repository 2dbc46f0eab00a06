//! Error types for everyday-ai.
//!
//! Two layers live here:
//!
//! - [`Failure`] / [`ErrorCategory`] — the classified outcome of a registry
//!   fetch or a tool request. Every category carries a stable error code
//!   (SCREAMING_SNAKE_CASE) that is included in the Display output and
//!   accessible via [`ErrorCategory::code()`].
//! - [`Error`] — configuration and durable storage problems on the host side.

/// Stable error codes for programmatic error handling.
///
/// These codes never change and form part of the public API contract.
pub mod error_codes {
    /// Discovery endpoint failed or returned an unusable body.
    pub const REGISTRY_ERROR: &str = "REGISTRY_ERROR";

    /// No response was received from the backend.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

    /// Request deadline elapsed or the request was aborted.
    pub const TIMEOUT: &str = "TIMEOUT";

    /// A successful response did not carry a JSON payload.
    pub const INVALID_RESPONSE_FORMAT: &str = "INVALID_RESPONSE_FORMAT";

    /// HTTP 400.
    pub const BAD_REQUEST: &str = "BAD_REQUEST";

    /// HTTP 401.
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";

    /// HTTP 403.
    pub const FORBIDDEN: &str = "FORBIDDEN";

    /// HTTP 404.
    pub const NOT_FOUND: &str = "NOT_FOUND";

    /// HTTP 429.
    pub const RATE_LIMITED: &str = "RATE_LIMITED";

    /// HTTP 500, 502, 503 or 504.
    pub const SERVER_ERROR: &str = "SERVER_ERROR";

    /// Any other non-2xx status.
    pub const UNKNOWN_HTTP: &str = "UNKNOWN_HTTP";
}

/// Classification of a failed registry fetch or tool request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Discovery endpoint failure.
    RegistryError,
    /// No response received.
    NetworkError,
    /// Deadline elapsed or request aborted.
    Timeout,
    /// 2xx response that is not JSON.
    InvalidResponseFormat,
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// HTTP 429.
    RateLimited,
    /// HTTP 500, 502, 503 or 504.
    ServerError {
        /// The exact status, used to pick a distinct user message.
        status: u16,
    },
    /// Any other non-2xx status.
    UnknownHttp {
        /// The status the backend returned.
        status: u16,
    },
}

impl ErrorCategory {
    /// Returns the stable error code for this category.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RegistryError => error_codes::REGISTRY_ERROR,
            Self::NetworkError => error_codes::NETWORK_ERROR,
            Self::Timeout => error_codes::TIMEOUT,
            Self::InvalidResponseFormat => error_codes::INVALID_RESPONSE_FORMAT,
            Self::BadRequest => error_codes::BAD_REQUEST,
            Self::Unauthorized => error_codes::UNAUTHORIZED,
            Self::Forbidden => error_codes::FORBIDDEN,
            Self::NotFound => error_codes::NOT_FOUND,
            Self::RateLimited => error_codes::RATE_LIMITED,
            Self::ServerError { .. } => error_codes::SERVER_ERROR,
            Self::UnknownHttp { .. } => error_codes::UNKNOWN_HTTP,
        }
    }

    /// The HTTP status behind this category, when there is one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::BadRequest => Some(400),
            Self::Unauthorized => Some(401),
            Self::Forbidden => Some(403),
            Self::NotFound => Some(404),
            Self::RateLimited => Some(429),
            Self::ServerError { status } | Self::UnknownHttp { status } => Some(*status),
            Self::RegistryError
            | Self::NetworkError
            | Self::Timeout
            | Self::InvalidResponseFormat => None,
        }
    }

    /// Returns true if a user-initiated retry has a reasonable chance of succeeding.
    ///
    /// Nothing in this crate retries automatically; hosts use this to decide
    /// whether to offer a "Try again" action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NetworkError
            | Self::Timeout
            | Self::RateLimited
            | Self::ServerError { .. } => true,
            Self::RegistryError
            | Self::InvalidResponseFormat
            | Self::BadRequest
            | Self::Unauthorized
            | Self::Forbidden
            | Self::NotFound
            | Self::UnknownHttp { .. } => false,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified failure with its raw diagnostic detail.
///
/// The detail is meant for logs. Users see the sentence produced by
/// [`crate::pipeline::humanize`] instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{}] {}", .category.code(), .detail)]
pub struct Failure {
    category: ErrorCategory,
    detail: String,
    /// Set when the detail came from a backend `{error: ...}` body rather
    /// than from the transport or a status line.
    from_backend: bool,
    /// User-facing sentence attached by the request pipeline.
    message: Option<String>,
}

impl Failure {
    /// Create a failure from a category and a diagnostic detail.
    pub fn new(category: ErrorCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
            from_backend: false,
            message: None,
        }
    }

    /// Create a failure whose detail is the backend's own error message.
    pub fn from_backend(category: ErrorCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
            from_backend: true,
            message: None,
        }
    }

    /// Attach the sentence to show the user.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The sentence to show the user.
    ///
    /// Falls back to the context-free humanized message when the pipeline
    /// has not attached one (registry failures, for example).
    pub fn user_message(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => crate::pipeline::humanize(self, None),
        }
    }

    /// The classification.
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// The raw diagnostic detail, without the code prefix.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Whether the detail was reported by the backend itself.
    pub fn is_backend_reported(&self) -> bool {
        self.from_backend
    }

    /// Shortcut for [`ErrorCategory::is_retryable`].
    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }
}

/// Host-side errors: configuration and durable storage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid, unreadable or unwritable configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Durable selection storage could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, Error>;
