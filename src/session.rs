//! Session — one run of the dashboard host.
//!
//! Owns the config, the [`SelectionStore`], the registry client and the
//! request pipeline. Created once at startup; dropping it is the teardown.
//! The persisted selection outlives the session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::capability::Capability;
use crate::config::DashboardConfig;
use crate::error::{Error, ErrorCategory, Failure};
use crate::pipeline::{RequestOptions, RequestPipeline, humanize};
use crate::registry::RegistryClient;
use crate::selection::{FileStorage, Reconciliation, SelectionStorage, SelectionStore};
use crate::surface::{SelectorRejection, SelectorView};
use crate::tools::{
    EmailEnhancement, EmailRequest, Itinerary, NewsDigest, NewsRequest, ToolRequest,
    TravelRequest,
};
use crate::transport::{HttpTransport, ReqwestTransport};

/// An in-flight registry fetch.
///
/// Dropping it unsettled (the caller's future was dropped mid-fetch) clears
/// the store's loading flag.
struct FetchGuard<'a> {
    store: &'a SelectionStore,
    settled: bool,
}

impl<'a> FetchGuard<'a> {
    fn begin(store: &'a SelectionStore) -> Self {
        store.begin_fetch();
        Self {
            store,
            settled: false,
        }
    }

    fn settle(
        mut self,
        outcome: Result<Vec<Capability>, Failure>,
    ) -> Result<Reconciliation, Failure> {
        self.settled = true;
        match outcome {
            Ok(capabilities) => Ok(self.store.apply_registry(capabilities)),
            Err(failure) => {
                self.store.apply_registry_failure(failure.clone());
                Err(failure)
            }
        }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.store.abandon_fetch();
        }
    }
}

/// Wiring for one host run.
pub struct Session {
    config: DashboardConfig,
    store: Arc<SelectionStore>,
    registry: RegistryClient,
    pipeline: RequestPipeline,
    /// Claimed by the first `ensure_registry` call.
    registry_claimed: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .field("registry", &self.registry)
            .field("registry_claimed", &self.registry_claimed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session from explicit parts.
    ///
    /// The selection is seeded from `storage` immediately; no network
    /// traffic happens until [`ensure_registry`](Self::ensure_registry) or a
    /// tool call.
    pub fn new(
        config: DashboardConfig,
        storage: Box<dyn SelectionStorage>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let store = Arc::new(SelectionStore::new(
            storage,
            config.storage_key.clone(),
            config.default_model.clone(),
        ));
        let registry = RegistryClient::from_config(&config, Arc::clone(&transport));
        let pipeline = RequestPipeline::new(transport, Arc::clone(&store), config.base_url.clone());

        tracing::info!(
            base_url = %config.base_url,
            model = %store.get_selection(),
            "session started"
        );

        Self {
            config,
            store,
            registry,
            pipeline,
            registry_claimed: AtomicBool::new(false),
        }
    }

    /// Session using the config file and selection file in the default
    /// directories, talking HTTP through reqwest.
    ///
    /// # Errors
    /// Returns `Error::Config` if an existing config file is invalid.
    pub fn open_default() -> Result<Self, Error> {
        let config = DashboardConfig::load_or_default(&crate::app_dirs::config_file())?;
        Ok(Self::new(
            config,
            Box::new(FileStorage::at_default_location()),
            Arc::new(ReqwestTransport::new()),
        ))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SelectionStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// The active capability id.
    pub fn selection(&self) -> String {
        self.store.get_selection()
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    /// Fetch the registry the first time this is called.
    ///
    /// Returns `None` when an earlier call already claimed the fetch, even
    /// if that fetch failed; use [`reload_registry`](Self::reload_registry)
    /// to retry.
    pub async fn ensure_registry(&self) -> Option<Result<Reconciliation, Failure>> {
        if self
            .registry_claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("registry already fetched this session");
            return None;
        }
        Some(self.refresh_registry().await)
    }

    /// User-initiated retry. Always issues a fetch.
    pub async fn reload_registry(&self) -> Result<Reconciliation, Failure> {
        self.registry_claimed.store(true, Ordering::Release);
        self.refresh_registry().await
    }

    async fn refresh_registry(&self) -> Result<Reconciliation, Failure> {
        let fetch = FetchGuard::begin(&self.store);
        let outcome = self.registry.fetch_registry().await;
        fetch.settle(outcome)
    }

    // -----------------------------------------------------------------------
    // Selector
    // -----------------------------------------------------------------------

    /// Current picker state, with the configured fallback list standing in
    /// for a failed registry.
    pub fn selector_view(&self) -> SelectorView {
        SelectorView::from_state(&self.store.snapshot(), &self.config.fallback_capabilities())
    }

    /// Pick a capability through the picker's rules.
    ///
    /// # Errors
    /// `Busy` while the registry loads, `NotOffered` for ids the picker does
    /// not list, `NotSaved` if persisting failed.
    pub fn request_selection(&self, id: &str) -> Result<(), SelectorRejection> {
        self.selector_view().check_request(id)?;
        self.store.set_selection(id).map_err(|e| {
            tracing::warn!(id, error = %e, "selection not saved");
            SelectorRejection::NotSaved(e.to_string())
        })
    }

    /// Set the selection directly, without picker checks.
    ///
    /// # Errors
    /// Returns `Error::Storage` if persisting failed; the selection is unchanged.
    pub fn set_selection(&self, id: &str) -> Result<(), Error> {
        self.store.set_selection(id)
    }

    // -----------------------------------------------------------------------
    // Tools
    // -----------------------------------------------------------------------

    /// Run any tool request: validate, then send with the tool's deadline.
    ///
    /// Validation failures return `BadRequest` without touching the network.
    pub async fn run_tool<R: ToolRequest>(
        &self,
        request: &R,
        cancel: Option<CancellationToken>,
    ) -> Result<R::Response, Failure> {
        if let Err(failure) = request.validate() {
            tracing::warn!(
                tool = R::CONTEXT.as_str(),
                detail = %failure.detail(),
                "tool request rejected before sending"
            );
            return Err(failure);
        }

        let body = serde_json::to_value(request).map_err(|e| {
            let failure = Failure::new(
                ErrorCategory::BadRequest,
                format!("request could not be encoded: {e}"),
            );
            let message = humanize(&failure, Some(R::CONTEXT));
            failure.with_message(message)
        })?;

        let mut options = RequestOptions::new().with_context(R::CONTEXT);
        if let Some(deadline) = R::deadline(&self.config.tools) {
            options = options.with_timeout(deadline);
        }
        if let Some(token) = cancel {
            options = options.with_cancel(token);
        }

        self.pipeline
            .execute_as::<R::Response>(R::ENDPOINT, body, &options)
            .await
    }

    /// Rewrite an email draft with the active capability.
    pub async fn enhance_email(&self, request: &EmailRequest) -> Result<EmailEnhancement, Failure> {
        self.run_tool(request, None).await
    }

    /// Generate an itinerary. Bounded by `tools.travel_timeout_secs`.
    pub async fn plan_trip(&self, request: &TravelRequest) -> Result<Itinerary, Failure> {
        self.run_tool(request, None).await
    }

    /// Curate a news digest.
    pub async fn fetch_news(&self, request: &NewsRequest) -> Result<NewsDigest, Failure> {
        self.run_tool(request, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::MemoryStorage;
    use crate::transport::{HttpRequest, HttpResponse, TransportError};
    use async_trait::async_trait;
    use crate::surface::SelectorStatus;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers discovery with a fixed body and counts every request.
    struct ScriptedTransport {
        discovery: HttpResponse,
        tool: HttpResponse,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(discovery: HttpResponse, tool: HttpResponse) -> Arc<Self> {
            Arc::new(Self {
                discovery,
                tool,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.requests.lock().map(|r| r.len()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let is_discovery = request.url.ends_with("/api/models");
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            Ok(if is_discovery {
                self.discovery.clone()
            } else {
                self.tool.clone()
            })
        }
    }

    fn discovery_ok() -> HttpResponse {
        HttpResponse::json(
            200,
            &json!({
                "deepseek-api": {"available": true, "type": "cloud", "description": "x"},
                "local-llama3": {"available": false, "type": "local", "description": "y"}
            }),
        )
    }

    /// Never answers.
    struct StalledTransport;

    #[async_trait]
    impl HttpTransport for StalledTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            std::future::pending().await
        }
    }

    fn stalled_session() -> Session {
        Session::new(
            DashboardConfig::new("http://localhost:3000").with_registry_timeout_secs(600),
            Box::new(MemoryStorage::new()),
            Arc::new(StalledTransport),
        )
    }

    fn session_with(transport: Arc<ScriptedTransport>, storage: MemoryStorage) -> Session {
        Session::new(
            DashboardConfig::new("http://localhost:3000"),
            Box::new(storage),
            transport,
        )
    }

    #[tokio::test]
    async fn ensure_registry_fetches_once() {
        let transport = ScriptedTransport::new(discovery_ok(), HttpResponse::json(200, &json!({})));
        let session = session_with(Arc::clone(&transport), MemoryStorage::new());

        assert!(matches!(session.ensure_registry().await, Some(Ok(_))));
        assert!(session.ensure_registry().await.is_none());
        assert!(session.ensure_registry().await.is_none());
        assert_eq!(transport.count(), 1);
    }

    #[tokio::test]
    async fn reload_always_fetches() {
        let transport = ScriptedTransport::new(discovery_ok(), HttpResponse::json(200, &json!({})));
        let session = session_with(Arc::clone(&transport), MemoryStorage::new());

        assert!(session.reload_registry().await.is_ok());
        assert!(session.reload_registry().await.is_ok());
        assert!(session.ensure_registry().await.is_none());
        assert_eq!(transport.count(), 2);
    }

    #[tokio::test]
    async fn scenario_from_discovery() {
        let transport = ScriptedTransport::new(discovery_ok(), HttpResponse::json(200, &json!({})));
        let session = session_with(transport, MemoryStorage::new());
        assert!(session.ensure_registry().await.is_some());

        let view = session.selector_view();
        assert_eq!(view.remote().len() + view.local().len(), 2);
        assert!(view.remote().iter().any(|c| c.id() == "deepseek-api"));
        assert!(view.local().iter().any(|c| c.id() == "local-llama3" && !c.is_available()));
        assert!(view.degraded_notice().is_some());
    }

    #[tokio::test]
    async fn stale_selection_is_reset_after_fetch() {
        let transport = ScriptedTransport::new(discovery_ok(), HttpResponse::json(200, &json!({})));
        let storage = MemoryStorage::with_value("everyday-ai-model", "local-deepseek-r1");
        let session = session_with(transport, storage);

        assert_eq!(session.selection(), "local-deepseek-r1");
        let outcome = session.ensure_registry().await;
        assert!(matches!(outcome, Some(Ok(Reconciliation::Reset(ref id))) if id == "deepseek-api"));
        assert_eq!(session.selection(), "deepseek-api");
    }

    #[tokio::test]
    async fn failed_registry_degrades_to_fallback() {
        let transport = ScriptedTransport::new(
            HttpResponse::new(503, Some("text/html"), "<html>"),
            HttpResponse::json(200, &json!({})),
        );
        let session = session_with(transport, MemoryStorage::new());

        let outcome = session.ensure_registry().await;
        assert!(matches!(
            outcome.map(|r| r.map_err(|f| f.category())),
            Some(Err(ErrorCategory::RegistryError))
        ));

        let state = session.store().snapshot();
        assert!(state.registry_snapshot.is_empty());
        assert!(state.last_error.is_some());

        let view = session.selector_view();
        assert!(view.is_fallback());
        assert!(session.request_selection("deepseek-api").is_ok());
    }

    #[tokio::test]
    async fn request_selection_applies_picker_rules() {
        let transport = ScriptedTransport::new(discovery_ok(), HttpResponse::json(200, &json!({})));
        let session = session_with(transport, MemoryStorage::new());
        assert!(session.ensure_registry().await.is_some());

        assert_eq!(
            session.request_selection("local-llama3"),
            Err(SelectorRejection::NotOffered("local-llama3".into()))
        );
        assert_eq!(session.selection(), "deepseek-api");

        // Direct writes skip the picker.
        assert!(session.set_selection("local-llama3").is_ok());
        assert_eq!(session.selection(), "local-llama3");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_fetch_does_not_leave_picker_loading() {
        let session = stalled_session();

        let gave_up =
            tokio::time::timeout(Duration::from_secs(1), session.ensure_registry()).await;
        assert!(gave_up.is_err());

        assert!(!session.store().is_loading());
        let view = session.selector_view();
        assert_ne!(view.status(), SelectorStatus::Loading);
        assert_ne!(
            session.request_selection("deepseek-api"),
            Err(SelectorRejection::Busy)
        );
        assert!(session.store().last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_reload_keeps_previous_snapshot() {
        use crate::capability::CapabilityKind;

        let session = stalled_session();
        session.store().apply_registry(vec![
            Capability::new("deepseek-api", CapabilityKind::Remote, true, "x"),
            Capability::new("local-llama3", CapabilityKind::Local, false, "y"),
        ]);

        let gave_up =
            tokio::time::timeout(Duration::from_secs(1), session.reload_registry()).await;
        assert!(gave_up.is_err());

        let view = session.selector_view();
        assert_eq!(view.status(), SelectorStatus::Ready);
        assert_eq!(view.remote().len() + view.local().len(), 2);
        assert!(session.request_selection("deepseek-api").is_ok());
    }

    #[tokio::test]
    async fn request_selection_busy_while_loading() {
        let transport = ScriptedTransport::new(discovery_ok(), HttpResponse::json(200, &json!({})));
        let session = session_with(transport, MemoryStorage::new());
        session.store().begin_fetch();
        assert_eq!(
            session.request_selection("deepseek-api"),
            Err(SelectorRejection::Busy)
        );
    }

    #[tokio::test]
    async fn invalid_tool_request_sends_nothing() {
        let transport = ScriptedTransport::new(discovery_ok(), HttpResponse::json(200, &json!({})));
        let session = session_with(Arc::clone(&transport), MemoryStorage::new());

        let result = session.enhance_email(&EmailRequest::new("")).await;
        assert!(matches!(
            result.map_err(|f| f.category()),
            Err(ErrorCategory::BadRequest)
        ));
        assert_eq!(transport.count(), 0);
    }

    #[tokio::test]
    async fn fetch_news_decodes_digest() {
        let transport = ScriptedTransport::new(
            discovery_ok(),
            HttpResponse::json(
                200,
                &json!({"articles": [{"title": "Rates held", "category": "economy"}]}),
            ),
        );
        let session = session_with(Arc::clone(&transport), MemoryStorage::new());

        let digest = session
            .fetch_news(&NewsRequest::new(["economy"]))
            .await
            .unwrap_or_else(|e| panic!("Expected Ok, got Err: {e}"));
        assert_eq!(digest.articles.len(), 1);

        let sent = transport.requests.lock().map(|r| r.clone()).unwrap_or_default();
        assert_eq!(sent[0].url, "http://localhost:3000/api/news/fetch");
        assert_eq!(
            sent[0].body,
            Some(json!({"categories": ["economy"], "model": "deepseek-api"}))
        );
    }

    #[tokio::test]
    async fn run_tool_honours_cancellation() {
        let transport = ScriptedTransport::new(discovery_ok(), HttpResponse::json(200, &json!({})));
        let session = session_with(Arc::clone(&transport), MemoryStorage::new());
        let token = CancellationToken::new();
        token.cancel();

        let result = session
            .run_tool(&NewsRequest::new(["world"]), Some(token))
            .await;
        assert!(matches!(
            result.map_err(|f| f.category()),
            Err(ErrorCategory::Timeout)
        ));
        assert_eq!(transport.count(), 0);
    }

    #[test]
    fn session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
    }
}
