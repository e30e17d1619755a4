//! Enumeration and indexed random access over a directory of pack files,
//! with an LRU of parsed indices and their key sets.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use git_hash::collections::OidSet;
use git_hash::{HashAlgorithm, ObjectId};
use git_utils::FileCache;
use lru::LruCache;

use crate::index::PackIndex;
use crate::pack::PackFile;
use crate::PackError;

/// Index LRU capacity: parsed `.idx` files are small, but reparsing one for
/// every lookup would still add up.
pub const INDEX_LRU_CAPACITY: usize = 8;

/// Key-set LRU capacity. Counted in packs, not individual keys.
pub const KEYS_LRU_CAPACITY: usize = 128 * 1024;

/// A resolver for ref-delta bases that live outside the pack being read.
pub type Resolver<'a> = &'a dyn Fn(&ObjectId) -> Option<(git_object::ObjectType, Vec<u8>)>;

/// Read-side view over `dot_git/objects/pack/`.
pub struct Packed {
    pack_dir: PathBuf,
    hash_algo: HashAlgorithm,
    file_cache: Arc<FileCache>,
    index_lru: Mutex<LruCache<ObjectId, Arc<PackIndex>>>,
    keys_lru: Mutex<LruCache<ObjectId, Arc<OidSet>>>,
}

impl Packed {
    pub fn open(pack_dir: impl AsRef<Path>, hash_algo: HashAlgorithm) -> Self {
        Self::with_file_cache(pack_dir, hash_algo, Arc::new(FileCache::new()))
    }

    pub fn with_file_cache(
        pack_dir: impl AsRef<Path>,
        hash_algo: HashAlgorithm,
        file_cache: Arc<FileCache>,
    ) -> Self {
        Self {
            pack_dir: pack_dir.as_ref().to_path_buf(),
            hash_algo,
            file_cache,
            index_lru: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(INDEX_LRU_CAPACITY).unwrap(),
            )),
            keys_lru: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(KEYS_LRU_CAPACITY).unwrap(),
            )),
        }
    }

    fn idx_path(&self, pack_sha: &ObjectId) -> PathBuf {
        self.pack_dir.join(format!("pack-{}.idx", pack_sha.to_hex()))
    }

    fn pack_path(&self, pack_sha: &ObjectId) -> PathBuf {
        self.pack_dir
            .join(format!("pack-{}.pack", pack_sha.to_hex()))
    }

    /// Enumerate the packs present in this directory by their pack SHA.
    pub fn list(&self) -> Result<Vec<ObjectId>, PackError> {
        let mut out = Vec::new();
        let entries = match std::fs::read_dir(&self.pack_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(hex) = name.strip_prefix("pack-").and_then(|s| s.strip_suffix(".idx")) else {
                continue;
            };
            if let Ok(oid) = ObjectId::from_hex(hex) {
                out.push(oid);
            }
        }
        out.sort();
        Ok(out)
    }

    /// Get the parsed index for `pack_sha`, via the LRU.
    pub fn read_index(&self, pack_sha: &ObjectId) -> Result<Arc<PackIndex>, PackError> {
        if let Some(idx) = self.index_lru.lock().unwrap().get(pack_sha) {
            return Ok(idx.clone());
        }
        let idx = Arc::new(PackIndex::read_with_cache(
            self.idx_path(pack_sha),
            &self.file_cache,
        )?);
        self.index_lru
            .lock()
            .unwrap()
            .push(*pack_sha, idx.clone());
        Ok(idx)
    }

    /// Get the set of object keys contained in `pack_sha`, via the LRU.
    pub fn read_keys(&self, pack_sha: &ObjectId) -> Result<Arc<OidSet>, PackError> {
        if let Some(keys) = self.keys_lru.lock().unwrap().get(pack_sha) {
            return Ok(keys.clone());
        }
        let idx = self.read_index(pack_sha)?;
        let keys: OidSet = idx.iter().map(|(oid, _)| oid).collect();
        let keys = Arc::new(keys);
        self.keys_lru
            .lock()
            .unwrap()
            .push(*pack_sha, keys.clone());
        Ok(keys)
    }

    /// Whether `h` is present in `pack_sha`, per its index.
    pub fn mem_in_pack(&self, pack_sha: &ObjectId, h: &ObjectId) -> Result<bool, PackError> {
        Ok(self.read_index(pack_sha)?.lookup(h).is_some())
    }

    /// Read an object out of a specific pack, resolving ref-deltas with `recurse`.
    pub fn read_in_pack(
        &self,
        pack_sha: &ObjectId,
        h: &ObjectId,
        recurse: Resolver<'_>,
    ) -> Result<Option<(git_object::ObjectType, Vec<u8>)>, PackError> {
        let idx = self.read_index(pack_sha)?;
        if idx.lookup(h).is_none() {
            return Ok(None);
        }
        // `PackFile::open` mmaps the pack; reopening per lookup is cheap and
        // keeps this component's only caching surface its index/key LRUs.
        let pack = PackFile::open(self.pack_path(pack_sha))?;
        let obj = pack.read_object_with_resolver(h, recurse)?;
        Ok(obj.map(|o| (o.obj_type, o.data)))
    }

    /// Fold over `list()`, returning the first pack that yields `h`.
    pub fn read(
        &self,
        h: &ObjectId,
        recurse: Resolver<'_>,
    ) -> Result<Option<(git_object::ObjectType, Vec<u8>)>, PackError> {
        for pack_sha in self.list()? {
            if let Some(found) = self.read_in_pack(&pack_sha, h, recurse)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    /// Fold over `list()`, returning `true` on the first `mem_in_pack` hit.
    pub fn mem(&self, h: &ObjectId) -> Result<bool, PackError> {
        for pack_sha in self.list()? {
            if self.mem_in_pack(&pack_sha, h)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Write a pack and its index to disk. No-op if the pack already exists.
    pub fn write_pack(
        &self,
        pack_sha: &ObjectId,
        pack_bytes: &[u8],
        idx_bytes: &[u8],
    ) -> Result<(), PackError> {
        use std::io::Write;
        use git_utils::tempfile::TempFile;

        std::fs::create_dir_all(&self.pack_dir)?;

        let pack_path = self.pack_path(pack_sha);
        if !pack_path.exists() {
            let mut tmp = TempFile::new_for(&pack_path)?;
            tmp.write_all(pack_bytes)?;
            tmp.persist(&pack_path)?;
        }

        let idx_path = self.idx_path(pack_sha);
        if !idx_path.exists() {
            let mut tmp = TempFile::new_for(&idx_path)?;
            tmp.write_all(idx_bytes)?;
            tmp.persist(&idx_path)?;
        }

        Ok(())
    }

    /// Drop both LRUs, forcing re-read of indices and key sets on next access.
    pub fn clear(&self) {
        self.index_lru.lock().unwrap().clear();
        self.keys_lru.lock().unwrap().clear();
    }
}
