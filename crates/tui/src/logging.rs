use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "info";

fn env_filter(filter: Option<&str>) -> Result<EnvFilter> {
    let directive: Directive = filter
        .unwrap_or(DEFAULT_DIRECTIVE)
        .parse()
        .with_context(|| format!("invalid log directive '{}'", filter.unwrap_or_default()))?;
    Ok(EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy())
}

/// Compact logs on stderr for one-shot commands.
pub fn init_stderr(filter: Option<&str>) -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}

/// Logs appended to a file, keeping the terminal free for the TUI.
pub fn init_file(filter: Option<&str>, path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter)?)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_directives() {
        assert!(env_filter(Some("info")).is_ok());
        assert!(env_filter(Some("tasklight_core=debug")).is_ok());
        assert!(env_filter(Some("tasklight=loud")).is_err());
    }
}
