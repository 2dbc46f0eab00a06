//! The three dashboard tools: request bodies, response payloads, endpoints.
//!
//! | Tool   | Endpoint                    | Default deadline |
//! |--------|-----------------------------|------------------|
//! | Email  | `POST /api/email/enhance`   | none             |
//! | Travel | `POST /api/travel/generate` | 60 s             |
//! | News   | `POST /api/news/fetch`      | none             |
//!
//! Each request validates locally with the same required-field rules the
//! backend applies, so an obviously bad request never leaves the process.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::ToolsConfig;
use crate::error::{ErrorCategory, Failure};
use crate::pipeline::{ToolContext, humanize};

/// Email enhancement endpoint.
pub const EMAIL_ENDPOINT: &str = "/api/email/enhance";
/// Travel itinerary endpoint.
pub const TRAVEL_ENDPOINT: &str = "/api/travel/generate";
/// News digest endpoint.
pub const NEWS_ENDPOINT: &str = "/api/news/fetch";

/// A request body for one tool endpoint.
pub trait ToolRequest: Serialize {
    /// Typed success payload.
    type Response: DeserializeOwned;

    /// Which tool this is.
    const CONTEXT: ToolContext;

    /// Endpoint path relative to the backend origin.
    const ENDPOINT: &'static str;

    /// Deadline for this tool under `config`.
    fn deadline(config: &ToolsConfig) -> Option<Duration>;

    /// Check required fields.
    ///
    /// # Errors
    /// Returns a `BadRequest` failure naming the first invalid field.
    fn validate(&self) -> Result<(), Failure>;
}

fn invalid(context: ToolContext, detail: String) -> Failure {
    let failure = Failure::new(ErrorCategory::BadRequest, detail);
    let message = humanize(&failure, Some(context));
    failure.with_message(message)
}

fn require_text(context: ToolContext, field: &str, value: &str) -> Result<(), Failure> {
    if value.trim().is_empty() {
        return Err(invalid(context, format!("{field} must be a non-empty string")));
    }
    Ok(())
}

fn require_positive(context: ToolContext, field: &str, value: u32) -> Result<(), Failure> {
    if value == 0 {
        return Err(invalid(context, format!("{field} must be a positive integer")));
    }
    Ok(())
}

fn require_list<T>(context: ToolContext, field: &str, value: &[T]) -> Result<(), Failure> {
    if value.is_empty() {
        return Err(invalid(context, format!("{field} must be a non-empty list")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// Rewrite an email draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub email_content: String,
}

impl EmailRequest {
    pub fn new(email_content: impl Into<String>) -> Self {
        Self {
            email_content: email_content.into(),
        }
    }
}

impl ToolRequest for EmailRequest {
    type Response = EmailEnhancement;
    const CONTEXT: ToolContext = ToolContext::Email;
    const ENDPOINT: &'static str = EMAIL_ENDPOINT;

    fn deadline(config: &ToolsConfig) -> Option<Duration> {
        config.email_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<(), Failure> {
        require_text(Self::CONTEXT, "email_content", &self.email_content)
    }
}

/// Enhanced email with a short analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailEnhancement {
    pub enhanced_email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub original_email_score: String,
    #[serde(default)]
    pub recommended_subject: String,
    #[serde(default)]
    pub key_improvements: Vec<String>,
    #[serde(default)]
    pub analysis: EmailAnalysis,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailAnalysis {
    pub tone: String,
    pub clarity: String,
    pub conciseness: String,
    pub call_to_action: String,
}

// ---------------------------------------------------------------------------
// Travel
// ---------------------------------------------------------------------------

/// Plan a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelRequest {
    pub destination: String,
    /// Total budget in dollars.
    pub budget: u32,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `YYYY-MM-DD`.
    pub end_date: String,
    pub travelers: u32,
    pub preferences: Vec<String>,
}

impl ToolRequest for TravelRequest {
    type Response = Itinerary;
    const CONTEXT: ToolContext = ToolContext::Travel;
    const ENDPOINT: &'static str = TRAVEL_ENDPOINT;

    fn deadline(config: &ToolsConfig) -> Option<Duration> {
        Some(Duration::from_secs(config.travel_timeout_secs))
    }

    fn validate(&self) -> Result<(), Failure> {
        let ctx = Self::CONTEXT;
        require_text(ctx, "destination", &self.destination)?;
        require_positive(ctx, "budget", self.budget)?;
        require_text(ctx, "start_date", &self.start_date)?;
        require_text(ctx, "end_date", &self.end_date)?;
        require_positive(ctx, "travelers", self.travelers)?;
        require_list(ctx, "preferences", &self.preferences)
    }
}

/// Generated itinerary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    #[serde(default)]
    pub destination: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub total_cost: String,
    /// `within_budget` or `over_budget`.
    #[serde(default)]
    pub budget_status: String,
    pub daily_itinerary: Vec<DayPlan>,
    #[serde(default)]
    pub travel_tips: Vec<String>,
    #[serde(default)]
    pub budget_breakdown: BudgetBreakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: u32,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub day_of_week: String,
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub description: String,
    /// culture, food, adventure, relaxation, sightseeing or shopping.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cost: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    #[serde(default, deserialize_with = "lenient_string")]
    pub accommodation: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub food: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub activities: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transportation: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub other: String,
}

// ---------------------------------------------------------------------------
// News
// ---------------------------------------------------------------------------

/// Curate headlines for some categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRequest {
    pub categories: Vec<String>,
    /// Country to focus on. The backend infers one from the client IP when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl NewsRequest {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

impl ToolRequest for NewsRequest {
    type Response = NewsDigest;
    const CONTEXT: ToolContext = ToolContext::News;
    const ENDPOINT: &'static str = NEWS_ENDPOINT;

    fn deadline(config: &ToolsConfig) -> Option<Duration> {
        config.news_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<(), Failure> {
        require_list(Self::CONTEXT, "categories", &self.categories)?;
        if let Some(i) = self.categories.iter().position(|c| c.trim().is_empty()) {
            return Err(invalid(
                Self::CONTEXT,
                format!("category at index {i} must be a non-empty string"),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsDigest {
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub category: String,
    pub source: String,
}

/// Accept strings, numbers and null where a display string is expected.
/// Models are inconsistent about `"$50"` versus `50`.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
