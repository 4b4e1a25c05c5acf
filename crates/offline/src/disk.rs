//! On-disk cache generations: one directory per generation, one metadata file and
//! one body file per entry, named by the SHA-256 of the request identity.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use url::Url;

use crate::cache::{CacheError, CacheStorage};
use crate::http::{Response, ResponseType};

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";
const STAGING_SUFFIX: &str = ".staging";

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    url: String,
    status: u16,
    kind: ResponseType,
    redirected: bool,
    headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, cache: &str) -> Result<PathBuf, CacheError> {
        let valid = !cache.is_empty()
            && !cache.ends_with(STAGING_SUFFIX)
            && cache
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
            && cache != "."
            && cache != "..";
        if !valid {
            return Err(CacheError::InvalidName(cache.to_string()));
        }
        Ok(self.root.join(cache))
    }

    async fn write_entry(dir: &Path, key: &str, response: &Response) -> Result<(), CacheError> {
        fs::create_dir_all(dir).await?;
        let stem = entry_stem(key);
        let meta = EntryMeta {
            key: key.to_string(),
            url: response.url.to_string(),
            status: response.status,
            kind: response.kind,
            redirected: response.redirected,
            headers: response.headers.clone(),
        };
        fs::write(dir.join(format!("{stem}.{BODY_EXT}")), &response.body).await?;
        fs::write(
            dir.join(format!("{stem}.{META_EXT}")),
            serde_json::to_vec_pretty(&meta)?,
        )
        .await?;
        Ok(())
    }
}

fn entry_stem(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn not_found(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut reader = match fs::read_dir(&self.root).await {
            Ok(reader) => reader,
            Err(err) if not_found(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(STAGING_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn has(&self, cache: &str) -> Result<bool, CacheError> {
        let dir = self.generation_dir(cache)?;
        match fs::metadata(&dir).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if not_found(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn delete(&self, cache: &str) -> Result<bool, CacheError> {
        let dir = self.generation_dir(cache)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(err) if not_found(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn lookup(&self, cache: &str, key: &str) -> Result<Option<Response>, CacheError> {
        let dir = self.generation_dir(cache)?;
        let stem = entry_stem(key);
        let raw_meta = match fs::read(dir.join(format!("{stem}.{META_EXT}"))).await {
            Ok(raw) => raw,
            Err(err) if not_found(&err) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let meta: EntryMeta = serde_json::from_slice(&raw_meta)?;
        if meta.key != key {
            return Ok(None);
        }
        let body = fs::read(dir.join(format!("{stem}.{BODY_EXT}"))).await?;

        Ok(Some(Response {
            url: Url::parse(&meta.url)?,
            status: meta.status,
            kind: meta.kind,
            redirected: meta.redirected,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, cache: &str, key: &str, response: &Response) -> Result<(), CacheError> {
        let dir = self.generation_dir(cache)?;
        Self::write_entry(&dir, key, response).await
    }

    async fn entries(&self, cache: &str) -> Result<Vec<String>, CacheError> {
        let dir = self.generation_dir(cache)?;
        let mut reader = match fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(err) if not_found(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(META_EXT) {
                continue;
            }
            let meta: EntryMeta = serde_json::from_slice(&fs::read(&path).await?)?;
            keys.push(meta.key);
        }
        keys.sort();
        Ok(keys)
    }

    /// A fresh generation is written to a staging directory and renamed into place,
    /// so a failed write never leaves a half-seeded generation behind.
    async fn put_all(&self, cache: &str, entries: &[(String, Response)]) -> Result<(), CacheError> {
        let dir = self.generation_dir(cache)?;
        if self.has(cache).await? {
            for (key, response) in entries {
                Self::write_entry(&dir, key, response).await?;
            }
            return Ok(());
        }

        let staging = self.root.join(format!("{cache}{STAGING_SUFFIX}"));
        if let Err(err) = fs::remove_dir_all(&staging).await {
            if !not_found(&err) {
                return Err(err.into());
            }
        }
        fs::create_dir_all(&staging).await?;

        for (key, response) in entries {
            if let Err(err) = Self::write_entry(&staging, key, response).await {
                let _ = fs::remove_dir_all(&staging).await;
                return Err(err);
            }
        }
        fs::rename(&staging, &dir).await?;
        Ok(())
    }
}
