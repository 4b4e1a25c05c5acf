pub use tasklight_tui::cli;
pub use tasklight_tui::commands;
pub use tasklight_tui::config;
pub use tasklight_tui::host;
pub use tasklight_tui::logging;
pub use tasklight_tui::tui;
pub use tasklight_tui::AppConfig;

pub use tasklight_core as core;
pub use tasklight_core::model;
pub use tasklight_core::services;
pub use tasklight_core::storage;

pub use tasklight_offline as offline;
