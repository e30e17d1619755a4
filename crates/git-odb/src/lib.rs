//! Unified object database for git.
//!
//! Provides a single interface to read and write objects across loose
//! storage and packfiles, backed by a shared [`FileCache`] and an
//! in-process [`ValueCache`]. This is the primary abstraction that all
//! higher-level git operations use to access objects.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use git_hash::collections::OidSet;
use git_hash::{HashAlgorithm, ObjectId};
use git_loose::LooseObjectStore;
use git_object::cache::ValueCache;
use git_object::{header, Object, ObjectType};
use git_pack::packed::Packed;
use git_pack::write as pack_write;
use git_utils::FileCache;

pub use error::OdbError;

mod error {
    use git_hash::ObjectId;

    #[derive(Debug, thiserror::Error)]
    pub enum OdbError {
        #[error("object not found: {0}")]
        NotFound(ObjectId),

        #[error("ambiguous object name: {prefix} matches {count} objects")]
        Ambiguous { prefix: String, count: usize },

        #[error("corrupt object {oid}: {reason}")]
        Corrupt { oid: ObjectId, reason: String },

        #[error("invalid configuration: {0}")]
        ConfigError(String),

        #[error(transparent)]
        Loose(#[from] git_loose::LooseError),

        #[error(transparent)]
        Pack(#[from] git_pack::PackError),

        #[error(transparent)]
        Object(#[from] git_object::ObjectError),

        #[error(transparent)]
        Hash(#[from] git_hash::HashError),

        #[error(transparent)]
        Io(#[from] std::io::Error),
    }
}

/// Lightweight object info (header only, no content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub obj_type: ObjectType,
    pub size: usize,
}

/// Default capacity of the in-process [`ValueCache`].
pub const DEFAULT_VALUE_CACHE_CAPACITY: usize = 512;

/// Unified object store: loose objects, packed objects, and the caches
/// that sit in front of both.
pub struct Store {
    loose: LooseObjectStore,
    packed: Packed,
    cache: Mutex<ValueCache>,
    file_cache: Arc<FileCache>,
    objects_dir: PathBuf,
    hash_algo: HashAlgorithm,
}

impl Store {
    /// Open the store rooted at `objects_dir` (typically `.git/objects`).
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self::open_with_algo(objects_dir, HashAlgorithm::Sha1)
    }

    /// Open the store with a specific hash algorithm.
    pub fn open_with_algo(objects_dir: impl AsRef<Path>, hash_algo: HashAlgorithm) -> Self {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        let file_cache = Arc::new(FileCache::new());
        let loose = LooseObjectStore::with_file_cache(&objects_dir, hash_algo, file_cache.clone());
        let packed = Packed::with_file_cache(objects_dir.join("pack"), hash_algo, file_cache.clone());
        Self {
            loose,
            packed,
            cache: Mutex::new(ValueCache::new(DEFAULT_VALUE_CACHE_CAPACITY)),
            file_cache,
            objects_dir,
            hash_algo,
        }
    }

    /// Open the store with a specific hash algorithm and loose-object zlib
    /// compression level. `level` must be in `0..=9`.
    pub fn open_with_level(
        objects_dir: impl AsRef<Path>,
        hash_algo: HashAlgorithm,
        level: u32,
    ) -> Result<Self, OdbError> {
        let mut store = Self::open_with_algo(objects_dir, hash_algo);
        store
            .loose
            .set_compression_level(level)
            .map_err(|e| OdbError::ConfigError(e.to_string()))?;
        Ok(store)
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Resolve an abbreviated hex prefix (or a full hash) to an exact OID.
    /// Short prefixes are resolved against loose objects only, per
    /// [`git_loose::LooseObjectStore::resolve_short`].
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ObjectId, OdbError> {
        if prefix.len() == self.hash_algo.hex_len() {
            if let Ok(oid) = ObjectId::from_hex(prefix) {
                if self.contains(&oid) {
                    return Ok(oid);
                }
                return Err(OdbError::NotFound(oid));
            }
        }
        match self.loose.resolve_short(prefix) {
            Ok(Some(oid)) => Ok(oid),
            Ok(None) => Err(OdbError::NotFound(ObjectId::NULL_SHA1)),
            Err(git_loose::LooseError::Ambiguous { prefix, count }) => {
                Err(OdbError::Ambiguous { prefix, count })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// A resolver closure usable as the `recurse` parameter of
    /// `Packed::read`/`read_in_pack`: looks a ref-delta base up through this
    /// same store's `read_inflated`, so a base living in loose storage or in
    /// another pack can still be found. Takes `&self` explicitly rather than
    /// the store holding a resolver on itself, so there is no self-reference
    /// or re-entrant lock.
    fn resolver(&self) -> impl Fn(&ObjectId) -> Option<(ObjectType, Vec<u8>)> + '_ {
        move |oid: &ObjectId| {
            self.read_inflated(oid).ok().flatten().map(|bytes| {
                let (obj_type, _, header_len) =
                    header::parse_header(&bytes).expect("loose/packed bytes are framed");
                (obj_type, bytes[header_len..].to_vec())
            })
        }
    }

    /// Read a parsed object by exact OID.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        if let Some(obj) = self.cache.lock().unwrap().find(oid) {
            return Ok(Some(obj.clone()));
        }
        if let Some(obj) = self.loose.read(oid)? {
            self.cache.lock().unwrap().insert(*oid, obj.clone());
            return Ok(Some(obj));
        }
        let resolver = self.resolver();
        if let Some((obj_type, content)) = self.packed.read(oid, &resolver)? {
            let obj = Object::parse_content(obj_type, &content).map_err(|e| OdbError::Corrupt {
                oid: *oid,
                reason: e.to_string(),
            })?;
            self.cache.lock().unwrap().insert(*oid, obj.clone());
            return Ok(Some(obj));
        }
        Ok(None)
    }

    /// Read with caching. `read` itself already populates the cache on a
    /// miss, so this is equivalent; kept as a named entry point for callers
    /// that want to make the caching intent explicit.
    pub fn read_cached(&self, oid: &ObjectId) -> Result<Option<Object>, OdbError> {
        self.read(oid)
    }

    /// Read the raw inflated (header + content) bytes of an object by exact OID.
    pub fn read_inflated(&self, oid: &ObjectId) -> Result<Option<Arc<Vec<u8>>>, OdbError> {
        if let Some(bytes) = self.cache.lock().unwrap().find_inflated(oid) {
            return Ok(Some(bytes.clone()));
        }
        if let Some(bytes) = self.loose.read_inflated(oid)? {
            self.cache
                .lock()
                .unwrap()
                .insert_inflated(*oid, bytes.clone());
            return Ok(Some(bytes));
        }
        let resolver = self.resolver();
        if let Some((obj_type, content)) = self.packed.read(oid, &resolver)? {
            let mut framed = header::write_header(obj_type, content.len());
            framed.extend_from_slice(&content);
            let framed = Arc::new(framed);
            self.cache
                .lock()
                .unwrap()
                .insert_inflated(*oid, framed.clone());
            return Ok(Some(framed));
        }
        Ok(None)
    }

    /// Read just the header (type + size) without materializing full content.
    pub fn read_header(&self, oid: &ObjectId) -> Result<Option<ObjectInfo>, OdbError> {
        if let Some(obj) = self.cache.lock().unwrap().find(oid) {
            let size = obj.serialize_content().len();
            return Ok(Some(ObjectInfo {
                obj_type: obj.object_type(),
                size,
            }));
        }
        if let Some((obj_type, size)) = self.loose.read_header(oid)? {
            return Ok(Some(ObjectInfo { obj_type, size }));
        }
        // Packs don't store size independently of content; read the object.
        let resolver = self.resolver();
        if let Some((obj_type, content)) = self.packed.read(oid, &resolver)? {
            return Ok(Some(ObjectInfo {
                obj_type,
                size: content.len(),
            }));
        }
        Ok(None)
    }

    /// Read a parsed object, erroring if it doesn't exist.
    pub fn read_exn(&self, oid: &ObjectId) -> Result<Object, OdbError> {
        self.read(oid)?.ok_or(OdbError::NotFound(*oid))
    }

    /// Whether an object exists by exact OID.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        if self.cache.lock().unwrap().find(oid).is_some() {
            return true;
        }
        if self.loose.contains(oid) {
            return true;
        }
        self.packed.mem(oid).unwrap_or(false)
    }

    /// Alias for [`Self::contains`] under the name used elsewhere in the
    /// codebase for this operation.
    pub fn mem(&self, oid: &ObjectId) -> Result<bool, OdbError> {
        Ok(self.contains(oid))
    }

    /// Enumerate every object key known to this store: loose objects plus
    /// the union of every pack's key set.
    pub fn list(&self) -> Result<OidSet, OdbError> {
        let mut keys = OidSet::new();
        for result in self.loose.iter()? {
            keys.insert(result?);
        }
        for pack_sha in self.packed.list()? {
            for oid in self.packed.read_keys(&pack_sha)?.iter() {
                keys.insert(*oid);
            }
        }
        Ok(keys)
    }

    /// Read every object this store knows about.
    pub fn contents(&self) -> Result<Vec<Object>, OdbError> {
        self.list()?.iter().map(|oid| self.read_exn(oid)).collect()
    }

    /// Iterate over all known object OIDs (for fsck/gc).
    pub fn iter_all_oids(
        &self,
    ) -> Result<Box<dyn Iterator<Item = Result<ObjectId, OdbError>> + '_>, OdbError> {
        let keys = self.list()?;
        Ok(Box::new(keys.iter().copied().collect::<Vec<_>>().into_iter().map(Ok)))
    }

    /// Re-read the pack directory and drop cached state, so newly written or
    /// removed packs (e.g. after gc/repack) are picked up.
    pub fn refresh(&self) -> Result<(), OdbError> {
        self.clear();
        Ok(())
    }

    /// Write a parsed object to loose storage. Idempotent.
    pub fn write(&self, obj: &Object) -> Result<ObjectId, OdbError> {
        let oid = self.loose.write(obj)?;
        self.cache.lock().unwrap().insert(oid, obj.clone());
        Ok(oid)
    }

    /// Write raw content with a known type (always to loose storage). Idempotent.
    pub fn write_raw(&self, obj_type: ObjectType, content: &[u8]) -> Result<ObjectId, OdbError> {
        let oid = self.loose.write_raw(obj_type, content)?;
        if let Ok(obj) = Object::parse_content(obj_type, content) {
            self.cache.lock().unwrap().insert(oid, obj);
        }
        Ok(oid)
    }

    /// Write already-framed (header + content) bytes to loose storage.
    /// Idempotent.
    pub fn write_inflated(&self, bytes: &[u8]) -> Result<ObjectId, OdbError> {
        let oid = self.loose.write_inflated(bytes)?;
        self.cache
            .lock()
            .unwrap()
            .insert_inflated(oid, Arc::new(bytes.to_vec()));
        Ok(oid)
    }

    /// Write a raw pack, deriving and writing its index, and return the set
    /// of object keys it contains. Idempotent — a no-op if the pack (keyed
    /// by its trailing checksum) already exists.
    pub fn write_pack(&self, raw_pack: &[u8]) -> Result<OidSet, OdbError> {
        let resolver = self.resolver();
        let (mut entries, pack_sha) =
            pack_write::index_raw_pack(raw_pack, self.hash_algo, &resolver)?;
        let idx_bytes = pack_write::build_pack_index_bytes(&mut entries, &pack_sha)?;
        self.packed.write_pack(&pack_sha, raw_pack, &idx_bytes)?;
        let keys = self.packed.read_keys(&pack_sha)?;
        Ok(keys.iter().copied().collect())
    }

    /// Drop the file cache and packed-object LRUs, forcing re-reads from
    /// disk. The decoded/inflated `ValueCache` is untouched.
    pub fn clear(&self) {
        self.file_cache.clear();
        self.packed.clear();
    }
}
