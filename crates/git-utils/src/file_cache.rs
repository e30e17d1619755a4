//! Path-keyed cache of file contents, holding only weak references.
//!
//! Pack files and loose objects can be megabytes; a caller that reads one
//! often holds onto the bytes only briefly, and the OS page cache is
//! authoritative for the underlying disk I/O anyway. This cache exists to
//! shortcut a re-read while some caller is still holding the bytes — it
//! never pins a buffer in memory on its own.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use crate::Result;

/// Weak-reference cache mapping an absolute path to its file contents.
pub struct FileCache {
    entries: Mutex<HashMap<PathBuf, Weak<Vec<u8>>>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Read a file's full contents, going through the cache.
    ///
    /// On hit, returns the existing strong handle. On miss (including a
    /// weak reference whose bytes have already been reclaimed), reads the
    /// file, stores a weak entry, and returns a fresh strong handle.
    pub fn read(&self, path: &Path) -> Result<Arc<Vec<u8>>> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(weak) = entries.get(path) {
            if let Some(strong) = weak.upgrade() {
                return Ok(strong);
            }
        }

        let bytes = Arc::new(fs::read(path)?);
        entries.insert(path.to_path_buf(), Arc::downgrade(&bytes));
        Ok(bytes)
    }

    /// Drop every entry (weak or otherwise).
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Number of entries whose weak reference is still live.
    ///
    /// Intended for tests; a stale (unreclaimable) count would require a
    /// full sweep, which `clear`/`read` do lazily instead.
    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new()
    }
}
