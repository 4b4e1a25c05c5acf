use std::env;
use std::time::Duration;

use anyhow::Result;
use url::Url;

pub use tasklight_core::config::*;
pub use tasklight_offline::OfflineConfig;

use crate::cli::{CacheArgs, Cli, TuiArgs};

const ENV_ORIGIN: &str = "TASKLIGHT_ORIGIN";

pub fn from_cli(cli: &Cli) -> Result<AppConfig> {
    AppConfig::discover(cli.data_dir.clone())
}

/// Applies the TUI's reminder override on top of the discovered configuration.
pub fn for_tui(cli: &Cli, args: &TuiArgs) -> Result<AppConfig> {
    let config = from_cli(cli)?;
    Ok(match args.reminder_interval {
        Some(secs) => config.with_reminder_interval(Duration::from_secs(secs)),
        None => config,
    })
}

/// Offline settings for the TUI, present only when an origin is configured.
pub fn tui_offline(args: &TuiArgs) -> Option<OfflineConfig> {
    let origin = match args.origin.clone() {
        Some(origin) => origin,
        None => {
            let raw = env::var(ENV_ORIGIN).ok()?;
            match Url::parse(raw.trim()) {
                Ok(origin) => origin,
                Err(err) => {
                    tracing::warn!(value = raw.as_str(), error = %err, "ignoring invalid {}", ENV_ORIGIN);
                    return None;
                }
            }
        }
    };
    Some(OfflineConfig::new(origin))
}

pub fn cache_offline(args: &CacheArgs) -> OfflineConfig {
    let config = OfflineConfig::new(args.origin.clone());
    match args.cache_version {
        Some(version) => config.with_version(version),
        None => config,
    }
}
