//! Terminal implementations of the platform capabilities: notification permission
//! kept in the data directory, a notification log the shell displays, the launcher
//! install offer and the offline worker wiring.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use tasklight_core::services::{
    InstallChoice, InstallOffer, InstallPrompt, Notification, NotificationGateway,
    NotificationPlatform, NotificationSurface, NotifyError, Permission, PushManager,
    PushSubscription, SubscribeOptions,
};
use tasklight_core::{FileStore, KeyValueStore};
use tasklight_offline::{
    register, DiskCacheStorage, HttpFetcher, OfflineConfig, OfflineWorker, Registration,
    WindowClients,
};
use url::Url;

use crate::config::AppConfig;

pub const PERMISSION_KEY: &str = "notifications";

/// Every notification shown during the session, newest last.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn latest(&self) -> Option<Notification> {
        self.entries.lock().last().cloned()
    }

    /// Notifications recorded after the first `seen` entries.
    pub fn since(&self, seen: usize) -> Vec<Notification> {
        self.entries.lock().iter().skip(seen).cloned().collect()
    }
}

#[async_trait]
impl NotificationSurface for NotificationLog {
    async fn show_notification(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            title = notification.title.as_str(),
            body = notification.body.as_str(),
            "notification shown"
        );
        self.entries.lock().push(notification.clone());
        Ok(())
    }
}

/// Permission state persisted next to the task store so it survives restarts.
pub struct TerminalPlatform {
    store: Mutex<FileStore>,
    display: Arc<NotificationLog>,
}

impl TerminalPlatform {
    pub fn open(config: &AppConfig, display: Arc<NotificationLog>) -> Result<Self> {
        let path = config.permissions_path();
        let store = FileStore::open(&path)
            .with_context(|| format!("Failed to open permission store at {}", path.display()))?;
        Ok(Self {
            store: Mutex::new(store),
            display,
        })
    }

    pub fn stored_permission(&self) -> Permission {
        let raw = match self.store.lock().get(PERMISSION_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(error = %err, "permission unreadable");
                None
            }
        };
        raw.and_then(|value| value.parse::<Permission>().ok())
            .unwrap_or_default()
    }

    pub fn set_permission(&self, permission: Permission) -> Result<()> {
        self.store
            .lock()
            .set(PERMISSION_KEY, permission.as_str().to_string())
            .context("Failed to persist notification permission")?;
        tracing::debug!(permission = permission.as_str(), "permission stored");
        Ok(())
    }
}

#[async_trait]
impl NotificationPlatform for TerminalPlatform {
    fn permission(&self) -> Option<Permission> {
        Some(self.stored_permission())
    }

    /// Asking from the terminal is an explicit user action, so it always grants.
    async fn request_permission(&self) -> Result<Permission, NotifyError> {
        self.set_permission(Permission::Granted)?;
        Ok(Permission::Granted)
    }

    async fn show(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.display.show_notification(notification).await
    }
}

/// No push service is reachable from a terminal session.
#[derive(Debug, Default)]
pub struct TerminalPush;

#[async_trait]
impl PushManager for TerminalPush {
    async fn subscribe(&self, options: SubscribeOptions) -> Result<PushSubscription, NotifyError> {
        tracing::debug!(key_len = options.application_server_key.len(), "push subscribe requested");
        Err(NotifyError::PushUnavailable(
            "no push service is configured for terminal sessions".to_string(),
        ))
    }
}

/// The terminal session is the only window; opening another is logged.
#[derive(Debug, Default)]
pub struct TerminalWindows {
    attached: bool,
}

impl TerminalWindows {
    pub fn attached() -> Self {
        Self { attached: true }
    }

    pub fn detached() -> Self {
        Self { attached: false }
    }
}

#[async_trait]
impl WindowClients for TerminalWindows {
    async fn windows(&self) -> Result<Vec<String>> {
        Ok(if self.attached {
            vec!["terminal".to_string()]
        } else {
            Vec::new()
        })
    }

    async fn focus(&self, id: &str) -> Result<()> {
        tracing::debug!(window = id, "focus window");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<()> {
        tracing::info!(url = %url, "open window requested");
        Ok(())
    }
}

/// Installing writes a marker into the data directory.
pub struct LauncherOffer {
    marker: PathBuf,
}

impl LauncherOffer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            marker: config.install_marker_path(),
        }
    }
}

#[async_trait]
impl InstallOffer for LauncherOffer {
    async fn prompt(self: Box<Self>) -> Result<InstallChoice> {
        fs::write(&self.marker, concat!("tasklight ", env!("CARGO_PKG_VERSION"), "\n"))
            .with_context(|| format!("Failed to write install marker {}", self.marker.display()))?;
        Ok(InstallChoice::Accepted)
    }
}

/// Install prompt seeded from the marker: installed already, or offering.
pub fn install_prompt(config: &AppConfig) -> InstallPrompt {
    let mut prompt = InstallPrompt::new();
    if config.install_marker_path().exists() {
        prompt.app_installed();
    } else {
        prompt.offer_available(Box::new(LauncherOffer::new(config)));
    }
    prompt
}

/// Capabilities of one terminal session.
pub struct Host {
    pub display: Arc<NotificationLog>,
    pub platform: Arc<TerminalPlatform>,
    pub gateway: NotificationGateway,
}

impl Host {
    pub fn open(config: &AppConfig) -> Result<Self> {
        let display = Arc::new(NotificationLog::new());
        let platform = Arc::new(TerminalPlatform::open(config, display.clone())?);
        let gateway = NotificationGateway::new(platform.clone()).with_push(Arc::new(TerminalPush));
        Ok(Self {
            display,
            platform,
            gateway,
        })
    }

    pub fn offline_worker(
        &self,
        config: &AppConfig,
        offline: &OfflineConfig,
        windows: TerminalWindows,
    ) -> Result<OfflineWorker> {
        let fetcher = HttpFetcher::new(offline.origin.clone()).context("Failed to build HTTP client")?;
        let worker = OfflineWorker::new(
            offline,
            Arc::new(DiskCacheStorage::new(config.cache_dir())),
            Arc::new(fetcher),
            self.display.clone(),
            Arc::new(windows),
        )?;
        Ok(worker)
    }

    /// Routes notifications through the offline worker. A generation left by an
    /// earlier run is reused as is; otherwise the worker is installed and activated.
    pub async fn attach_offline(&mut self, worker: OfflineWorker) -> Option<Registration> {
        let worker = Arc::new(worker);
        let registration = match worker.resume().await {
            Ok(true) => Registration::active(worker),
            Ok(false) => match register(worker).await {
                Ok(registration) => Some(registration),
                Err(err) => {
                    tracing::warn!(error = %err, "offline worker registration failed");
                    None
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "offline cache unavailable");
                None
            }
        }?;
        self.gateway.set_background(Arc::new(registration.clone()));
        tracing::info!(cache = registration.worker().cache_name(), "offline worker attached");
        Some(registration)
    }
}
