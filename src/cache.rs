// src/cache.rs

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};
use tracing::{debug, info};

use crate::error::Result;

/// Loaded datasets keyed by workbook path.
///
/// Entries are shared read-only through `Arc`; a cached value is replaced
/// only by [`WorkbookCache::invalidate`] or [`WorkbookCache::clear`]
/// followed by a fresh load. Nothing watches the file on disk.
#[derive(Debug)]
pub struct WorkbookCache<T> {
    map: RwLock<HashMap<PathBuf, Arc<T>>>,
}

impl<T> Default for WorkbookCache<T> {
    fn default() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> WorkbookCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `path`, or run `loader` and keep its
    /// result. A failed load caches nothing.
    pub fn get_or_load<F>(&self, path: &Path, loader: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let key = cache_key(path);
        {
            let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = map.get(&key) {
                debug!(path = %key.display(), "cache hit");
                return Ok(Arc::clone(hit));
            }
        }

        debug!(path = %key.display(), "cache miss");
        let loaded = Arc::new(loader(path)?);

        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        // another caller may have loaded it meanwhile; keep the first
        let entry = map.entry(key).or_insert(loaded);
        Ok(Arc::clone(entry))
    }

    /// Drop the entry for `path`. Returns whether one was present.
    pub fn invalidate(&self, path: &Path) -> bool {
        let key = cache_key(path);
        let removed = self
            .map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some();
        if removed {
            info!(path = %key.display(), "cache entry invalidated");
        }
        removed
    }

    pub fn clear(&self) {
        let mut map = self.map.write().unwrap_or_else(PoisonError::into_inner);
        info!(entries = map.len(), "cache cleared");
        map.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.map
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&cache_key(path))
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Canonical path when the file exists, so `./a.xlsx` and `a.xlsx` share an
/// entry; the path as given otherwise.
fn cache_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
