//! Lifecycle of the offline worker: install seeds a cache generation, activate evicts
//! older generations, and an activated worker answers fetches cache-first.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use tasklight_core::services::{Notification, NotificationSurface, NotifyError};
use thiserror::Error;
use url::Url;

use crate::cache::{CacheError, CacheStorage};
use crate::fetch::{FetchError, Fetcher};
use crate::http::{Request, Response};
use crate::OfflineConfig;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("pre-caching {url} failed with status {status}")]
    Precache { url: Url, status: u16 },
    #[error("worker cannot activate while {0}")]
    NotInstalled(WorkerState),
    #[error("invalid push payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("window client request failed: {0}")]
    Client(#[source] anyhow::Error),
    #[error("invalid asset url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open application windows the worker can focus or spawn.
#[async_trait]
pub trait WindowClients: Send + Sync {
    /// Identifiers of open windows, most recently focused first.
    async fn windows(&self) -> anyhow::Result<Vec<String>>;
    async fn focus(&self, id: &str) -> anyhow::Result<()>;
    async fn open_window(&self, url: &Url) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: FetchSource,
    /// Whether a network response was written into the active generation.
    pub stored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Focused(String),
    Opened(Url),
}

#[derive(Debug, Deserialize)]
struct PushPayload {
    title: String,
    #[serde(default)]
    body: String,
}

pub struct OfflineWorker {
    cache_name: String,
    origin: Url,
    manifest: Vec<Url>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    display: Arc<dyn NotificationSurface>,
    clients: Arc<dyn WindowClients>,
    state: RwLock<WorkerState>,
}

impl fmt::Debug for OfflineWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineWorker")
            .field("cache_name", &self.cache_name)
            .field("origin", &self.origin.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl OfflineWorker {
    pub fn new(
        config: &OfflineConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        display: Arc<dyn NotificationSurface>,
        clients: Arc<dyn WindowClients>,
    ) -> Result<Self, WorkerError> {
        Ok(Self {
            cache_name: config.cache_name(),
            origin: config.origin.clone(),
            manifest: config.manifest_urls()?,
            storage,
            fetcher,
            display,
            clients,
            state: RwLock::new(WorkerState::Parsed),
        })
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write() = state;
        tracing::debug!(cache = self.cache_name.as_str(), state = state.as_str(), "worker state");
    }

    /// Pre-fetches the whole manifest and seeds the current generation. Any failed
    /// asset aborts the phase before anything is written.
    pub async fn install(&self) -> Result<usize, WorkerError> {
        self.set_state(WorkerState::Installing);
        match self.precache().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed);
                tracing::info!(cache = self.cache_name.as_str(), assets = count, "offline assets installed");
                Ok(count)
            }
            Err(err) => {
                self.set_state(WorkerState::Redundant);
                tracing::warn!(cache = self.cache_name.as_str(), error = %err, "install aborted");
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize, WorkerError> {
        let mut entries = Vec::with_capacity(self.manifest.len());
        for url in &self.manifest {
            let request = Request::get(url.clone());
            let response = self.fetcher.fetch(&request).await?;
            if !response.is_ok() {
                return Err(WorkerError::Precache {
                    url: url.clone(),
                    status: response.status,
                });
            }
            entries.push((request.key().to_string(), response));
        }
        self.storage.put_all(&self.cache_name, &entries).await?;
        Ok(entries.len())
    }

    /// Evicts every generation other than the current one and starts serving.
    pub async fn activate(&self) -> Result<Vec<String>, WorkerError> {
        let state = self.state();
        if !matches!(state, WorkerState::Installed | WorkerState::Activated) {
            return Err(WorkerError::NotInstalled(state));
        }
        self.set_state(WorkerState::Activating);

        let mut deleted = Vec::new();
        let outcome = async {
            for name in self.storage.keys().await? {
                if name != self.cache_name && self.storage.delete(&name).await? {
                    deleted.push(name);
                }
            }
            Ok::<_, CacheError>(())
        }
        .await;

        if let Err(err) = outcome {
            self.set_state(state);
            return Err(err.into());
        }
        self.set_state(WorkerState::Activated);
        tracing::info!(cache = self.cache_name.as_str(), evicted = deleted.len(), "offline worker activated");
        Ok(deleted)
    }

    /// Picks up a generation installed by an earlier run. Returns whether the worker
    /// is now serving from cache.
    pub async fn resume(&self) -> Result<bool, WorkerError> {
        if self.storage.has(&self.cache_name).await? {
            self.set_state(WorkerState::Activated);
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn handle_fetch(&self, request: &Request) -> Result<Served, WorkerError> {
        let serving = self.state() == WorkerState::Activated && request.is_cacheable();

        if serving {
            match self.storage.lookup(&self.cache_name, request.key()).await {
                Ok(Some(response)) => {
                    tracing::debug!(url = %request.url, "served from cache");
                    return Ok(Served {
                        response,
                        source: FetchSource::Cache,
                        stored: false,
                    });
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(url = %request.url, error = %err, "cache lookup failed"),
            }
        }

        let response = self.fetcher.fetch(request).await?;
        let mut stored = false;
        if serving && response.is_cacheable() {
            match self.storage.put(&self.cache_name, request.key(), &response).await {
                Ok(()) => stored = true,
                Err(err) => tracing::warn!(url = %request.url, error = %err, "cache store failed"),
            }
        }

        Ok(Served {
            response,
            source: FetchSource::Network,
            stored,
        })
    }

    /// Shows a pushed `{title, body}` message on the display surface.
    pub async fn handle_push(&self, payload: &[u8]) -> Result<Notification, WorkerError> {
        let data: PushPayload = serde_json::from_slice(payload)?;
        let notification = Notification::new(data.title, data.body);
        self.display.show_notification(&notification).await?;
        Ok(notification)
    }

    pub async fn handle_notification_click(&self) -> Result<ClickOutcome, WorkerError> {
        let windows = self.clients.windows().await.map_err(WorkerError::Client)?;
        if let Some(first) = windows.into_iter().next() {
            self.clients.focus(&first).await.map_err(WorkerError::Client)?;
            return Ok(ClickOutcome::Focused(first));
        }

        let start = self.origin.join("/")?;
        self.clients
            .open_window(&start)
            .await
            .map_err(WorkerError::Client)?;
        Ok(ClickOutcome::Opened(start))
    }

    /// Every generation in storage, current or stale.
    pub async fn generations(&self) -> Result<Vec<String>, WorkerError> {
        Ok(self.storage.keys().await?)
    }

    /// Request identities stored in the current generation.
    pub async fn cached_entries(&self) -> Result<Vec<String>, WorkerError> {
        Ok(self.storage.entries(&self.cache_name).await?)
    }
}

/// Handle to an installed and activated worker. It doubles as the background
/// notification surface for the foreground application.
#[derive(Debug, Clone)]
pub struct Registration {
    worker: Arc<OfflineWorker>,
}

impl Registration {
    /// Wraps a worker that is already serving, such as one picked up by
    /// [`OfflineWorker::resume`].
    pub fn active(worker: Arc<OfflineWorker>) -> Option<Self> {
        (worker.state() == WorkerState::Activated).then_some(Self { worker })
    }

    pub fn worker(&self) -> &Arc<OfflineWorker> {
        &self.worker
    }
}

#[async_trait]
impl NotificationSurface for Registration {
    async fn show_notification(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.worker.display.show_notification(notification).await
    }
}

/// Installs and activates the worker.
pub async fn register(worker: Arc<OfflineWorker>) -> Result<Registration, WorkerError> {
    worker.install().await?;
    worker.activate().await?;
    Ok(Registration { worker })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::cache::MemoryCacheStorage;
    use crate::http::ResponseType;
    use crate::ASSET_MANIFEST;

    const ORIGIN: &str = "https://todo.example";

    #[derive(Default)]
    struct FakeNetwork {
        routes: Mutex<HashMap<String, Response>>,
        calls: AtomicUsize,
    }

    impl FakeNetwork {
        fn serving_manifest() -> Self {
            let network = Self::default();
            for path in ASSET_MANIFEST {
                network.route(path, 200, ResponseType::Basic);
            }
            network
        }

        fn route(&self, path: &str, status: u16, kind: ResponseType) {
            let url = url(path);
            self.routes.lock().insert(
                url.to_string(),
                Response::new(url, status, kind, format!("body of {path}")),
            );
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for FakeNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.routes
                .lock()
                .get(request.key())
                .cloned()
                .ok_or_else(|| FetchError::Unavailable(request.url.to_string()))
        }
    }

    #[derive(Default)]
    struct FakeDisplay {
        shown: Mutex<Vec<Notification>>,
    }

    #[async_trait]
    impl NotificationSurface for FakeDisplay {
        async fn show_notification(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.shown.lock().push(notification.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeClients {
        open: Vec<String>,
        focused: Mutex<Vec<String>>,
        opened: Mutex<Vec<Url>>,
    }

    #[async_trait]
    impl WindowClients for FakeClients {
        async fn windows(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.open.clone())
        }

        async fn focus(&self, id: &str) -> anyhow::Result<()> {
            self.focused.lock().push(id.to_string());
            Ok(())
        }

        async fn open_window(&self, url: &Url) -> anyhow::Result<()> {
            self.opened.lock().push(url.clone());
            Ok(())
        }
    }

    struct Harness {
        storage: Arc<MemoryCacheStorage>,
        network: Arc<FakeNetwork>,
        display: Arc<FakeDisplay>,
        clients: Arc<FakeClients>,
    }

    impl Harness {
        fn new(network: FakeNetwork) -> Self {
            Self {
                storage: Arc::new(MemoryCacheStorage::new()),
                network: Arc::new(network),
                display: Arc::new(FakeDisplay::default()),
                clients: Arc::new(FakeClients::default()),
            }
        }

        fn worker(&self, version: u32) -> OfflineWorker {
            let config = OfflineConfig::new(Url::parse(ORIGIN).unwrap()).with_version(version);
            OfflineWorker::new(
                &config,
                self.storage.clone(),
                self.network.clone(),
                self.display.clone(),
                self.clients.clone(),
            )
            .unwrap()
        }
    }

    fn url(path: &str) -> Url {
        Url::parse(ORIGIN).unwrap().join(path).unwrap()
    }

    #[tokio::test]
    async fn install_seeds_every_manifest_asset() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        let worker = harness.worker(1);

        assert_eq!(worker.install().await.unwrap(), 8);
        assert_eq!(worker.state(), WorkerState::Installed);
        assert_eq!(worker.cached_entries().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let network = FakeNetwork::serving_manifest();
        network.route("/icons/icon-300x300.png", 404, ResponseType::Basic);
        let harness = Harness::new(network);
        let worker = harness.worker(1);

        let err = worker.install().await.unwrap_err();
        assert!(matches!(err, WorkerError::Precache { status: 404, .. }));
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(harness.storage.keys().await.unwrap().is_empty());
        assert!(matches!(
            worker.activate().await,
            Err(WorkerError::NotInstalled(WorkerState::Redundant))
        ));
    }

    #[tokio::test]
    async fn failed_install_keeps_previous_generation_serving() {
        let network = FakeNetwork::serving_manifest();
        let harness = Harness::new(network);
        let current = harness.worker(1);
        register(Arc::new(harness.worker(1))).await.unwrap();

        harness.network.routes.lock().remove(url("/app.js").as_str());
        let next = harness.worker(2);
        assert!(next.install().await.is_err());

        assert_eq!(harness.storage.keys().await.unwrap(), vec!["tasklight-v1".to_string()]);
        assert!(current.resume().await.unwrap());
    }

    #[tokio::test]
    async fn activation_evicts_older_generations() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        let stale = Response::new(url("/"), 200, ResponseType::Basic, "old");
        harness.storage.put("tasklight-v1", url("/").as_str(), &stale).await.unwrap();

        let worker = harness.worker(2);
        worker.install().await.unwrap();
        let deleted = worker.activate().await.unwrap();

        assert_eq!(deleted, vec!["tasklight-v1".to_string()]);
        assert_eq!(harness.storage.keys().await.unwrap(), vec!["tasklight-v2".to_string()]);
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn activate_requires_install() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        let worker = harness.worker(1);
        assert!(matches!(
            worker.activate().await,
            Err(WorkerError::NotInstalled(WorkerState::Parsed))
        ));
    }

    #[tokio::test]
    async fn cache_hit_skips_the_network() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        let worker = Arc::new(harness.worker(1));
        register(worker.clone()).await.unwrap();
        let after_install = harness.network.calls();

        let served = worker.handle_fetch(&Request::get(url("/styles.css"))).await.unwrap();
        assert_eq!(served.source, FetchSource::Cache);
        assert_eq!(served.response.body, b"body of /styles.css".to_vec());
        assert_eq!(harness.network.calls(), after_install);
    }

    #[tokio::test]
    async fn miss_is_fetched_stored_then_hit() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        harness.network.route("/data.json", 200, ResponseType::Basic);
        let worker = Arc::new(harness.worker(1));
        register(worker.clone()).await.unwrap();
        let request = Request::get(url("/data.json"));

        let first = worker.handle_fetch(&request).await.unwrap();
        assert_eq!(first.source, FetchSource::Network);
        assert!(first.stored);
        let calls = harness.network.calls();

        let second = worker.handle_fetch(&request).await.unwrap();
        assert_eq!(second.source, FetchSource::Cache);
        assert_eq!(second.response, first.response);
        assert_eq!(harness.network.calls(), calls);
    }

    #[tokio::test]
    async fn uncacheable_responses_are_returned_but_not_stored() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        harness.network.route("/gone", 404, ResponseType::Basic);
        harness.network.route("/partial", 206, ResponseType::Basic);
        harness.network.route("/cdn.js", 200, ResponseType::Cors);
        let worker = Arc::new(harness.worker(1));
        register(worker.clone()).await.unwrap();

        for path in ["/gone", "/partial", "/cdn.js"] {
            let served = worker.handle_fetch(&Request::get(url(path))).await.unwrap();
            assert_eq!(served.source, FetchSource::Network);
            assert!(!served.stored);
        }
        let entries = worker.cached_entries().await.unwrap();
        assert_eq!(entries.len(), 8);
    }

    #[tokio::test]
    async fn requests_pass_through_before_activation() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        let worker = harness.worker(1);
        worker.install().await.unwrap();

        let served = worker.handle_fetch(&Request::get(url("/app.js"))).await.unwrap();
        assert_eq!(served.source, FetchSource::Network);
        assert!(!served.stored);
    }

    #[tokio::test]
    async fn network_failure_on_miss_is_an_error() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        let worker = Arc::new(harness.worker(1));
        register(worker.clone()).await.unwrap();

        let err = worker
            .handle_fetch(&Request::get(url("/offline-only")))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Fetch(FetchError::Unavailable(_))));
    }

    #[tokio::test]
    async fn push_payload_is_shown_with_fixed_icons() {
        let harness = Harness::new(FakeNetwork::default());
        let worker = harness.worker(1);

        let shown = worker
            .handle_push(br#"{"title":"Hi","body":"There"}"#)
            .await
            .unwrap();
        assert_eq!(shown, Notification::new("Hi", "There"));
        assert_eq!(shown.icon, "icons/icon-188x188.png");
        assert_eq!(shown.badge, "icons/icon-72x72.png");
        assert_eq!(harness.display.shown.lock().clone(), vec![shown]);
    }

    #[tokio::test]
    async fn bad_push_payload_shows_nothing() {
        let harness = Harness::new(FakeNetwork::default());
        let worker = harness.worker(1);

        assert!(matches!(
            worker.handle_push(b"not json").await,
            Err(WorkerError::Payload(_))
        ));
        assert!(harness.display.shown.lock().is_empty());
    }

    #[tokio::test]
    async fn click_focuses_first_window() {
        let mut harness = Harness::new(FakeNetwork::default());
        harness.clients = Arc::new(FakeClients {
            open: vec!["w1".to_string(), "w2".to_string()],
            ..FakeClients::default()
        });
        let worker = harness.worker(1);

        let outcome = worker.handle_notification_click().await.unwrap();
        assert_eq!(outcome, ClickOutcome::Focused("w1".to_string()));
        assert_eq!(harness.clients.focused.lock().clone(), vec!["w1".to_string()]);
        assert!(harness.clients.opened.lock().is_empty());
    }

    #[tokio::test]
    async fn click_without_windows_opens_root() {
        let harness = Harness::new(FakeNetwork::default());
        let worker = harness.worker(1);

        let outcome = worker.handle_notification_click().await.unwrap();
        assert_eq!(outcome, ClickOutcome::Opened(url("/")));
        assert_eq!(harness.clients.opened.lock().clone(), vec![url("/")]);
    }

    #[tokio::test]
    async fn registration_relays_notifications_to_worker_display() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        let registration = register(Arc::new(harness.worker(1))).await.unwrap();
        assert_eq!(registration.worker().state(), WorkerState::Activated);

        let note = Notification::reminder(2);
        registration.show_notification(&note).await.unwrap();
        assert_eq!(harness.display.shown.lock().clone(), vec![note]);
    }

    #[tokio::test]
    async fn resumed_worker_can_be_wrapped_without_network() {
        let harness = Harness::new(FakeNetwork::serving_manifest());
        register(Arc::new(harness.worker(1))).await.unwrap();
        let calls = harness.network.calls();

        let fresh = Arc::new(harness.worker(1));
        assert!(Registration::active(fresh.clone()).is_none());
        assert!(fresh.resume().await.unwrap());
        assert!(Registration::active(fresh).is_some());
        assert_eq!(harness.network.calls(), calls);
    }
}
