use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache entry could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        CacheError::Io { path: path.to_path_buf(), source }
    }
}

/// A cached lex result plus the fingerprint of the source it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub content_hash: u64,
    pub data: T,
}

/// Two-tier cache of per-file results: a `DashMap` in front of one JSON file
/// per source path. Entries are only served while the content hash matches.
///
/// Fingerprints come from `DefaultHasher`, whose output is not guaranteed
/// across Rust releases. A binary built with another toolchain computes
/// different file names and content hashes, so old entries become misses
/// and are rewritten; they are never served for the wrong source.
pub struct IncrementalCache<T> {
    memory: DashMap<String, CacheEntry<T>>,
    cache_dir: PathBuf,
    /// Bumped whenever the cached data layout changes.
    version: String,
}

impl<T> IncrementalCache<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(cache_dir: impl AsRef<Path>, version: &str) -> Result<Self, CacheError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::io(&cache_dir, e))?;
        debug!(dir = %cache_dir.display(), version, "opened export cache");
        Ok(Self { memory: DashMap::new(), cache_dir, version: version.to_string() })
    }

    fn hash_content(content: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        hasher.finish()
    }

    fn entry_path(&self, file_path: &str) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        self.version.hash(&mut hasher);
        self.cache_dir.join(format!("{:x}.json", hasher.finish()))
    }

    /// Cached data for `file_path`, if it was computed from exactly `content`.
    pub fn get(&self, file_path: &str, content: &str) -> Option<T> {
        let content_hash = Self::hash_content(content);

        if let Some(entry) = self.memory.get(file_path) {
            if entry.content_hash == content_hash {
                return Some(entry.data.clone());
            }
        }

        let path = self.entry_path(file_path);
        let raw = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(file = file_path, error = %err, "discarding unreadable cache entry");
                return None;
            }
        };
        if entry.content_hash != content_hash {
            debug!(file = file_path, "stale cache entry");
            return None;
        }
        let data = entry.data.clone();
        self.memory.insert(file_path.to_string(), entry);
        Some(data)
    }

    pub fn set(&self, file_path: &str, content: &str, data: T) -> Result<(), CacheError> {
        let entry = CacheEntry { content_hash: Self::hash_content(content), data };
        let json = serde_json::to_string(&entry)?;
        self.memory.insert(file_path.to_string(), entry);

        let path = self.entry_path(file_path);
        fs::write(&path, json).map_err(|e| CacheError::io(&path, e))
    }

    /// Drops both tiers.
    pub fn clear(&self) -> Result<(), CacheError> {
        self.memory.clear();
        fs::remove_dir_all(&self.cache_dir).map_err(|e| CacheError::io(&self.cache_dir, e))?;
        fs::create_dir_all(&self.cache_dir).map_err(|e| CacheError::io(&self.cache_dir, e))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { memory_entries: self.memory.len(), cache_dir: self.cache_dir.display().to_string() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub cache_dir: String,
}
