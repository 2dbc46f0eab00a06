//! Failure → one user-facing sentence.
//!
//! Raw details stay in the logs; users only ever see the sentences below.

use crate::error::{ErrorCategory, Failure};

/// Which tool issued the request, for context-specific wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolContext {
    Email,
    Travel,
    News,
}

impl ToolContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Travel => "travel",
            Self::News => "news",
        }
    }
}

impl std::fmt::Display for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const NETWORK: &str =
    "Unable to connect to our servers. Please check your internet connection and try again.";
const TIMEOUT: &str = "The request took too long to complete. Please try again with a simpler request or check your connection.";
const INVALID_FORMAT: &str =
    "We received an unexpected response from our servers. Please try again.";
const BAD_REQUEST: &str =
    "There was an issue with your request. Please check your input and try again.";
const UNAUTHORIZED: &str = "Authentication failed. Please refresh the page and try again.";
const FORBIDDEN: &str = "Access denied. Please check your permissions and try again.";
const NOT_FOUND: &str = "The requested service is currently unavailable. Please try again later.";
const RATE_LIMITED: &str =
    "You've made too many requests. Please wait a moment before trying again.";
const INTERNAL: &str =
    "We're experiencing technical difficulties. Please try again in a few minutes.";
const BAD_GATEWAY: &str =
    "Our servers are temporarily unavailable. Please try again in a few minutes.";
const UNAVAILABLE: &str =
    "Our service is temporarily down for maintenance. Please try again later.";
const GATEWAY_TIMEOUT: &str =
    "The request took too long to process. Please try again with a simpler request.";
const REGISTRY: &str =
    "We couldn't load the list of available models. Using fallback cloud models for now.";
const GENERIC: &str =
    "Something went wrong. Please try again or contact support if the problem continues.";
const APOLOGY_TAIL: &str = "Please try again or contact support if the issue persists.";

/// Markers that identify a failure inside the AI backend itself.
const MODEL_MARKERS: [&str; 3] = ["model", "AI", "generation"];

/// Produce the sentence shown to the user for `failure`.
///
/// Structured category first. Server-side failures whose backend detail
/// names the model get the tool-specific apology instead of the generic
/// status message.
///
/// # Examples
///
/// ```
/// use everyday_ai::error::{ErrorCategory, Failure};
/// use everyday_ai::pipeline::{ToolContext, humanize};
///
/// let failure = Failure::from_backend(
///     ErrorCategory::ServerError { status: 500 },
///     "AI generation failed",
/// );
/// assert_eq!(
///     humanize(&failure, Some(ToolContext::Travel)),
///     "We're having trouble generating your itinerary. \
///      Please try again or contact support if the issue persists."
/// );
/// ```
pub fn humanize(failure: &Failure, context: Option<ToolContext>) -> String {
    let category = failure.category();
    if matches!(
        category,
        ErrorCategory::ServerError { .. } | ErrorCategory::UnknownHttp { .. }
    ) && mentions_model(failure)
    {
        return model_apology(context);
    }
    category_message(category).to_string()
}

/// The fixed sentence for a category.
pub fn category_message(category: ErrorCategory) -> &'static str {
    match category {
        ErrorCategory::NetworkError => NETWORK,
        ErrorCategory::Timeout => TIMEOUT,
        ErrorCategory::InvalidResponseFormat => INVALID_FORMAT,
        ErrorCategory::BadRequest => BAD_REQUEST,
        ErrorCategory::Unauthorized => UNAUTHORIZED,
        ErrorCategory::Forbidden => FORBIDDEN,
        ErrorCategory::NotFound => NOT_FOUND,
        ErrorCategory::RateLimited => RATE_LIMITED,
        ErrorCategory::ServerError { status: 502 } => BAD_GATEWAY,
        ErrorCategory::ServerError { status: 503 } => UNAVAILABLE,
        ErrorCategory::ServerError { status: 504 } => GATEWAY_TIMEOUT,
        ErrorCategory::ServerError { .. } => INTERNAL,
        ErrorCategory::RegistryError => REGISTRY,
        ErrorCategory::UnknownHttp { .. } => GENERIC,
    }
}

fn mentions_model(failure: &Failure) -> bool {
    failure.is_backend_reported()
        && MODEL_MARKERS
            .iter()
            .any(|marker| failure.detail().contains(marker))
}

fn model_apology(context: Option<ToolContext>) -> String {
    let what = match context {
        Some(ToolContext::Email) => "processing your email",
        Some(ToolContext::Travel) => "generating your itinerary",
        Some(ToolContext::News) => "curating your news digest",
        None => "processing your request",
    };
    format!("We're having trouble {what}. {APOLOGY_TAIL}")
}
