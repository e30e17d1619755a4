//! LRU cache over parsed objects and their inflated byte framing.

use std::num::NonZeroUsize;
use std::sync::Arc;

use git_hash::ObjectId;
use lru::LruCache;

use crate::Object;

/// Default capacity (in entries) of each of `ValueCache`'s two LRUs.
pub const DEFAULT_CAPACITY: usize = 512;

fn capacity_of(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::new(1).unwrap())
}

/// Two independent, equally-sized LRUs: decoded objects and their inflated
/// (header + body, pre-deflate) byte framing.
///
/// The two caches are kept separate because a caller may want the raw bytes
/// (e.g. to re-deflate into a pack) without paying for a parse, or the parsed
/// value without holding onto the byte buffer.
pub struct ValueCache {
    decoded: LruCache<ObjectId, Object>,
    inflated: LruCache<ObjectId, Arc<Vec<u8>>>,
}

impl ValueCache {
    /// Create both LRUs with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            decoded: LruCache::new(capacity_of(capacity)),
            inflated: LruCache::new(capacity_of(capacity)),
        }
    }

    /// Look up a decoded object, promoting it to most-recently-used.
    pub fn find(&mut self, oid: &ObjectId) -> Option<&Object> {
        self.decoded.get(oid)
    }

    /// Look up inflated bytes, promoting it to most-recently-used.
    pub fn find_inflated(&mut self, oid: &ObjectId) -> Option<&Arc<Vec<u8>>> {
        self.inflated.get(oid)
    }

    /// Insert a decoded object.
    pub fn insert(&mut self, oid: ObjectId, obj: Object) {
        self.decoded.push(oid, obj);
    }

    /// Insert inflated bytes.
    pub fn insert_inflated(&mut self, oid: ObjectId, bytes: Arc<Vec<u8>>) {
        self.inflated.push(oid, bytes);
    }

    /// Drop every entry in both LRUs.
    pub fn clear(&mut self) {
        self.decoded.clear();
        self.inflated.clear();
    }

    /// Resize both LRUs to `new_capacity`, discarding existing entries.
    ///
    /// Matches the spec's contract that a capacity change discards rather
    /// than evicts down to the new size.
    pub fn resize(&mut self, new_capacity: usize) {
        self.decoded = LruCache::new(capacity_of(new_capacity));
        self.inflated = LruCache::new(capacity_of(new_capacity));
    }

    /// Number of decoded entries currently cached.
    pub fn len(&self) -> usize {
        self.decoded.len()
    }

    /// Whether the decoded LRU is empty.
    pub fn is_empty(&self) -> bool {
        self.decoded.is_empty()
    }
}

impl Default for ValueCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
