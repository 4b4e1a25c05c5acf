pub mod cli;
pub mod commands;
pub mod config;
pub mod host;
pub mod logging;
pub mod tui;

pub use tasklight_core as core;
pub use tasklight_core::model;
pub use tasklight_core::services;
pub use tasklight_core::storage;
pub use tasklight_offline as offline;

pub use tasklight_core::AppConfig;

use anyhow::{Context, Result};

/// Multi-threaded runtime for capability calls; the reminder keeps ticking on its
/// workers while the terminal thread blocks on user actions.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
