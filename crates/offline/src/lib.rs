//! Offline asset cache: versioned cache generations seeded at install time and a
//! cache-first fetch handler, plus the push and notification-click relay.

pub mod cache;
pub mod disk;
pub mod fetch;
pub mod http;
pub mod worker;

use url::Url;

pub use cache::{CacheError, CacheStorage, MemoryCacheStorage};
pub use disk::DiskCacheStorage;
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use http::{Request, Response, ResponseType};
pub use worker::{
    register, ClickOutcome, FetchSource, OfflineWorker, Registration, Served, WindowClients,
    WorkerError, WorkerState,
};

/// Bumped whenever the application shell changes; older generations are evicted on activation.
pub const CACHE_VERSION: u32 = 1;
pub const CACHE_PREFIX: &str = "tasklight-v";

/// The application shell pre-fetched at install time.
pub const ASSET_MANIFEST: [&str; 8] = [
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "/icons/icon-72x72.png",
    "/icons/icon-96x96.png",
    "/icons/icon-188x188.png",
    "/icons/icon-300x300.png",
];

pub fn cache_name(version: u32) -> String {
    format!("{CACHE_PREFIX}{version}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineConfig {
    pub origin: Url,
    pub version: u32,
}

impl OfflineConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            version: CACHE_VERSION,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn cache_name(&self) -> String {
        cache_name(self.version)
    }

    pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
        self.origin.join(path)
    }

    pub fn manifest_urls(&self) -> Result<Vec<Url>, url::ParseError> {
        ASSET_MANIFEST.iter().map(|path| self.resolve(path)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_resolves_against_origin() {
        let config = OfflineConfig::new(Url::parse("https://todo.example/app/").unwrap());
        let urls = config.manifest_urls().unwrap();
        assert_eq!(urls.len(), 8);
        assert_eq!(urls[0].as_str(), "https://todo.example/");
        assert_eq!(urls[3].as_str(), "https://todo.example/app.js");
    }

    #[test]
    fn cache_name_embeds_version() {
        assert_eq!(cache_name(1), "tasklight-v1");
        let config = OfflineConfig::new(Url::parse("http://localhost:8080").unwrap()).with_version(2);
        assert_eq!(config.cache_name(), "tasklight-v2");
    }
}
