pub mod commands;
pub mod config;
pub mod model;
pub mod services;
pub mod storage;

pub use commands::{delete_tasks, open_tasks};
pub use config::AppConfig;
pub use model::*;
pub use services::{NotificationGateway, TasksService, ViewSnapshot};
pub use storage::{FileStore, KeyValueStore, MemoryStore, TaskStore};
