//! Request pipeline for tool endpoints.
//!
//! [`RequestPipeline::execute`] sends one POST to a tool endpoint with the
//! active capability merged into the body, races it against an optional
//! deadline and cancellation token, and returns either the JSON payload or a
//! classified [`Failure`] carrying a humanized message. It never panics and
//! never hands a raw transport error back to the caller.

pub mod classify;
pub mod humanize;


use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ErrorCategory, Failure};
use crate::observability::{
    FIELD_MODEL, FIELD_REQUEST_ID, FIELD_TOOL, FIELD_URL, SPAN_PIPELINE_EXECUTE,
};
use crate::selection::SelectionStore;
use crate::transport::{HttpRequest, HttpTransport};

pub use classify::{
    classify_legacy_message, classify_response, classify_status, classify_transport_error,
};
pub use humanize::{ToolContext, category_message, humanize};

/// Body key carrying the active capability id.
pub const MODEL_KEY: &str = "model";

/// Body key wrapping a non-object body.
pub const INPUT_KEY: &str = "input";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Deadline for the whole call. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// External abort signal. Cancellation is reported as `Timeout`.
    pub cancel: Option<CancellationToken>,
    /// Tool issuing the call, for message wording and logs.
    pub context: Option<ToolContext>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_context(mut self, context: ToolContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Why a call ended before the transport answered.
enum Interrupted {
    Deadline(Duration),
    Cancelled,
}

/// Executes tool requests with the current selection.
#[derive(Clone)]
pub struct RequestPipeline {
    transport: Arc<dyn HttpTransport>,
    store: Arc<SelectionStore>,
    base_url: String,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RequestPipeline {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<SelectionStore>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            base_url: base_url.into(),
        }
    }

    /// The store the model id is read from.
    pub fn store(&self) -> &Arc<SelectionStore> {
        &self.store
    }

    /// Absolute URL for an endpoint path. Absolute URLs pass through.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// POST `body` to `endpoint` with the active capability id merged in.
    ///
    /// Every outcome is a value: the JSON payload on success, otherwise a
    /// [`Failure`] whose [`Failure::user_message`] is already worded for
    /// `options.context`.
    pub async fn execute(
        &self,
        endpoint: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<Value, Failure> {
        let request_id = Uuid::new_v4();
        let model = self.store.get_selection();
        let url = self.endpoint_url(endpoint);
        let tool = options.context.map(|c| c.as_str()).unwrap_or("none");

        let span = tracing::info_span!(
            SPAN_PIPELINE_EXECUTE,
            { FIELD_REQUEST_ID } = %request_id,
            { FIELD_TOOL } = tool,
            { FIELD_MODEL } = %model,
            { FIELD_URL } = %url,
        );
        self.execute_inner(url, with_model(body, &model), options)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        url: String,
        payload: Value,
        options: &RequestOptions,
    ) -> Result<Value, Failure> {
        let start = tokio::time::Instant::now();

        let outcome = if options.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            Err(Interrupted::Cancelled)
        } else {
            tracing::debug!("sending tool request");
            let send = self.transport.send(HttpRequest::post_json(url, payload));
            race(send, options.timeout, options.cancel.as_ref()).await
        };

        let result = match outcome {
            Ok(Ok(resp)) => {
                tracing::debug!(status = resp.status, body = %resp.body, "tool response received");
                classify_response(&resp)
            }
            Ok(Err(e)) => Err(classify_transport_error(&e)),
            Err(Interrupted::Deadline(limit)) => Err(Failure::new(
                ErrorCategory::Timeout,
                format!("request exceeded its {}s deadline", limit.as_secs()),
            )),
            Err(Interrupted::Cancelled) => Err(Failure::new(
                ErrorCategory::Timeout,
                "request aborted by caller",
            )),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(payload) => {
                tracing::info!(elapsed_ms, "tool request succeeded");
                Ok(payload)
            }
            Err(failure) => {
                tracing::warn!(
                    code = failure.category().code(),
                    detail = %failure.detail(),
                    elapsed_ms,
                    "tool request failed"
                );
                let message = humanize(&failure, options.context);
                Err(failure.with_message(message))
            }
        }
    }

    /// Like [`execute`](Self::execute), then deserialize the payload into `T`.
    ///
    /// A payload that does not match `T` is `InvalidResponseFormat`.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Value,
        options: &RequestOptions,
    ) -> Result<T, Failure> {
        let payload = self.execute(endpoint, body, options).await?;
        serde_json::from_value(payload).map_err(|e| {
            tracing::warn!(endpoint, error = %e, "tool response has unexpected shape");
            let failure = Failure::new(
                ErrorCategory::InvalidResponseFormat,
                format!("response does not match the expected shape: {e}"),
            );
            let message = humanize(&failure, options.context);
            failure.with_message(message)
        })
    }
}

/// Merge the model id into `body`.
///
/// Object bodies gain (or overwrite) the `model` key; anything else is
/// wrapped as `{"input": body, "model": id}`.
pub fn with_model(body: Value, model: &str) -> Value {
    match body {
        Value::Object(mut map) => {
            map.insert(MODEL_KEY.to_string(), Value::String(model.to_string()));
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert(INPUT_KEY.to_string(), other);
            map.insert(MODEL_KEY.to_string(), Value::String(model.to_string()));
            Value::Object(map)
        }
    }
}

/// Drive `fut` until it completes, the deadline passes, or `cancel` fires.
/// The losing future is dropped, which aborts an in-flight request.
async fn race<F: Future>(
    fut: F,
    timeout: Option<Duration>,
    cancel: Option<&CancellationToken>,
) -> Result<F::Output, Interrupted> {
    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        () = cancelled => Err(Interrupted::Cancelled),
        out = fut => Ok(out),
        () = deadline => Err(Interrupted::Deadline(timeout.unwrap_or_default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn model_is_merged_into_objects() {
        let body = with_model(json!({"email_content": "hi", "model": "stale"}), "gemini-flash");
        assert_eq!(body, json!({"email_content": "hi", "model": "gemini-flash"}));
    }

    #[test]
    fn non_object_bodies_are_wrapped() {
        assert_eq!(
            with_model(json!("plain text"), "deepseek-api"),
            json!({"input": "plain text", "model": "deepseek-api"})
        );
        assert_eq!(
            with_model(Value::Null, "deepseek-api"),
            json!({"input": null, "model": "deepseek-api"})
        );
    }

    #[test]
    fn options_builder() {
        let token = CancellationToken::new();
        let options = RequestOptions::new()
            .with_timeout(Duration::from_secs(60))
            .with_cancel(token.clone())
            .with_context(ToolContext::Travel);
        assert_eq!(options.timeout, Some(Duration::from_secs(60)));
        assert_eq!(options.context, Some(ToolContext::Travel));
        token.cancel();
        assert!(options.cancel.is_some_and(|t| t.is_cancelled()));
    }

    #[test]
    fn default_options_have_no_deadline() {
        let options = RequestOptions::default();
        assert!(options.timeout.is_none());
        assert!(options.cancel.is_none());
        assert!(options.context.is_none());
    }
}
