pub mod install;
pub mod notifications;
pub mod tasks;

pub use install::{InstallChoice, InstallOffer, InstallPrompt, InstallState};
pub use notifications::{
    spawn_reminders, Delivery, Notification, NotificationGateway, NotificationPlatform,
    NotificationSurface, NotifyControl, NotifyError, Permission, PushManager, PushSubscription,
    SubscribeOptions,
};
pub use tasks::{TasksService, ViewSnapshot};
