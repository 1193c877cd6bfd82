//! Persistent on-disk cache for GET responses.
//!
//! Entries are keyed by the SHA-256 of the request URL. Each entry is a
//! small JSON metadata file (status, final URL after redirects) next to the
//! raw body bytes, so binary image responses round-trip unchanged.
//!
//! The cache is append-only and keyed by request identity: concurrent
//! writers for different URLs never conflict, and duplicate in-flight
//! requests to the same URL write identical content.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// A response as stored by (and served from) the cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// HTTP status code
    pub status: u16,

    /// Final URL after any redirects
    pub final_url: String,

    /// Raw body bytes
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    status: u16,
    final_url: String,
}

/// Directory-backed response cache.
#[derive(Debug)]
pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    /// Opens (creating if necessary) a cache rooted at `dir`.
    pub fn open(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn entry_key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.body"))
    }

    /// Returns the cached response for `url`, if both entry files are
    /// present and readable.
    pub fn load(&self, url: &str) -> Option<CachedResponse> {
        let key = Self::entry_key(url);
        let meta_raw = std::fs::read_to_string(self.meta_path(&key)).ok()?;
        let meta: EntryMeta = serde_json::from_str(&meta_raw).ok()?;
        let body = std::fs::read(self.body_path(&key)).ok()?;
        Some(CachedResponse {
            status: meta.status,
            final_url: meta.final_url,
            body,
        })
    }

    /// Stores a response under `url`'s key, overwriting any previous entry.
    pub fn store(&self, url: &str, response: &CachedResponse) -> io::Result<()> {
        let key = Self::entry_key(url);
        let meta = EntryMeta {
            status: response.status,
            final_url: response.final_url.clone(),
        };
        let meta_raw = serde_json::to_string(&meta)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(self.body_path(&key), &response.body)?;
        std::fs::write(self.meta_path(&key), meta_raw)?;
        Ok(())
    }
}
