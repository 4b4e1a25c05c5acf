//! Permission negotiation, local notification delivery, the reminder timer and the
//! push registration stub.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const NOTIFICATION_ICON: &str = "icons/icon-188x188.png";
pub const NOTIFICATION_BADGE: &str = "icons/icon-72x72.png";

/// Public key handed to the push service. No backend holds the private half.
pub const APPLICATION_SERVER_KEY: &str =
    "BLY8Y4Xy0lXH5q8z3n7k9Q1wT2u6p9o0i1v3e5r7t9y2u4i6o8p0a1s3d5f7g9h2j4k6l8m0n1b3v5c7x9z0";

const REMINDER_TITLE: &str = "Unfinished tasks";
const TASK_ADDED_TITLE: &str = "New task added";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifications are not supported on this platform")]
    Unsupported,
    #[error("push messaging is not available: {0}")]
    PushUnavailable(String),
    #[error("invalid application server key: {0}")]
    InvalidKey(#[from] base64::DecodeError),
    #[error(transparent)]
    Platform(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Not requested yet.
    #[default]
    Default,
    Granted,
    Denied,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Default => "default",
            Permission::Granted => "granted",
            Permission::Denied => "denied",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "" => Ok(Permission::Default),
            "granted" => Ok(Permission::Granted),
            "denied" => Ok(Permission::Denied),
            other => Err(anyhow!(
                "Unknown permission '{}': expected default|granted|denied",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_BADGE.to_string(),
        }
    }

    pub fn task_added(text: &str) -> Self {
        Self::new(TASK_ADDED_TITLE, format!("Task: {text}"))
    }

    pub fn reminder(pending: usize) -> Self {
        Self::new(
            REMINDER_TITLE,
            format!("You have {pending} unfinished tasks. Don't forget to finish them!"),
        )
    }
}

/// Host notification API: permission state plus an immediate foreground display.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// `None` when the host has no notification support at all.
    fn permission(&self) -> Option<Permission>;
    async fn request_permission(&self) -> Result<Permission, NotifyError>;
    async fn show(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Display surface that keeps working while the shell is not focused.
#[async_trait]
pub trait NotificationSurface: Send + Sync {
    async fn show_notification(&self, notification: &Notification) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub user_visible_only: bool,
    pub application_server_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
}

#[async_trait]
pub trait PushManager: Send + Sync {
    async fn subscribe(&self, options: SubscribeOptions) -> Result<PushSubscription, NotifyError>;
}

/// Decodes a URL-safe base64 key, tolerating missing padding and the standard alphabet.
pub fn decode_server_key(key: &str) -> Result<Vec<u8>, NotifyError> {
    let normalized: String = key
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|ch| match ch {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(normalized)?)
}

/// Label and enabled flag for the shell's "enable notifications" trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyControl {
    pub label: &'static str,
    pub enabled: bool,
}

impl NotifyControl {
    const REQUESTABLE: Self = Self {
        label: "Enable notifications",
        enabled: true,
    };
    const ENABLED: Self = Self {
        label: "Notifications enabled",
        enabled: false,
    };
    const BLOCKED: Self = Self {
        label: "Notifications blocked",
        enabled: false,
    };
    const REFUSED: Self = Self {
        label: "Notifications disabled",
        enabled: true,
    };
    const UNAVAILABLE: Self = Self {
        label: "Notifications unavailable",
        enabled: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Skipped,
    Background,
    Foreground,
}

#[derive(Clone)]
pub struct NotificationGateway {
    platform: Option<Arc<dyn NotificationPlatform>>,
    background: Option<Arc<dyn NotificationSurface>>,
    push: Option<Arc<dyn PushManager>>,
}

impl NotificationGateway {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self {
            platform: Some(platform),
            background: None,
            push: None,
        }
    }

    /// Gateway for hosts without any notification support.
    pub fn unsupported() -> Self {
        Self {
            platform: None,
            background: None,
            push: None,
        }
    }

    pub fn with_background(mut self, surface: Arc<dyn NotificationSurface>) -> Self {
        self.background = Some(surface);
        self
    }

    pub fn with_push(mut self, push: Arc<dyn PushManager>) -> Self {
        self.push = Some(push);
        self
    }

    pub fn set_background(&mut self, surface: Arc<dyn NotificationSurface>) {
        self.background = Some(surface);
    }

    pub fn permission(&self) -> Option<Permission> {
        self.platform.as_ref().and_then(|platform| platform.permission())
    }

    pub fn is_granted(&self) -> bool {
        self.permission() == Some(Permission::Granted)
    }

    pub fn check_permission(&self) -> NotifyControl {
        match self.permission() {
            None => NotifyControl::UNAVAILABLE,
            Some(Permission::Granted) => NotifyControl::ENABLED,
            Some(Permission::Denied) => NotifyControl::BLOCKED,
            Some(Permission::Default) => NotifyControl::REQUESTABLE,
        }
    }

    pub async fn request_permission(&self) -> NotifyControl {
        let Some(platform) = self.platform.as_ref() else {
            return NotifyControl::UNAVAILABLE;
        };

        let permission = match platform.request_permission().await {
            Ok(permission) => permission,
            Err(err) => {
                tracing::warn!(error = %err, "notification permission request failed");
                Permission::Denied
            }
        };

        if permission == Permission::Granted {
            tracing::info!("notification permission granted");
            self.register_push().await;
            NotifyControl::ENABLED
        } else {
            tracing::info!(permission = permission.as_str(), "notification permission refused");
            NotifyControl::REFUSED
        }
    }

    pub async fn notify(&self, title: &str, body: &str) -> Delivery {
        self.deliver(&Notification::new(title, body)).await
    }

    pub async fn deliver(&self, notification: &Notification) -> Delivery {
        let Some(platform) = self.platform.as_ref() else {
            return Delivery::Skipped;
        };
        if platform.permission() != Some(Permission::Granted) {
            return Delivery::Skipped;
        }

        let result = match self.background.as_ref() {
            Some(surface) => surface
                .show_notification(notification)
                .await
                .map(|_| Delivery::Background),
            None => platform.show(notification).await.map(|_| Delivery::Foreground),
        };

        result.unwrap_or_else(|err| {
            tracing::warn!(title = notification.title.as_str(), error = %err, "notification not shown");
            Delivery::Skipped
        })
    }

    /// Attempts a push subscription; the outcome is only logged.
    pub async fn register_push(&self) -> Option<PushSubscription> {
        let push = self.push.as_ref()?;
        let key = match decode_server_key(APPLICATION_SERVER_KEY) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(error = %err, "push subscription skipped");
                return None;
            }
        };

        let options = SubscribeOptions {
            user_visible_only: true,
            application_server_key: key,
        };
        match push.subscribe(options).await {
            Ok(subscription) => {
                tracing::info!(endpoint = subscription.endpoint.as_str(), "push subscription successful");
                Some(subscription)
            }
            Err(err) => {
                tracing::warn!(error = %err, "push subscription failed");
                None
            }
        }
    }
}

/// Spawns the recurring reminder. The first reminder fires one full interval after start.
pub fn spawn_reminders<F>(gateway: NotificationGateway, pending: F, every: Duration) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if !gateway.is_granted() {
                continue;
            }
            let count = pending();
            if count == 0 {
                continue;
            }
            tracing::debug!(pending = count, "sending reminder");
            gateway.deliver(&Notification::reminder(count)).await;
        }
    })
}
