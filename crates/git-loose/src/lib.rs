//! Loose object storage: read, write, and enumerate zlib-compressed objects.
//!
//! Each loose object lives at `.git/objects/XX/YYYY...` where `XX` is the first
//! byte of the OID in hex and `YYYY...` is the rest. The file content is
//! zlib-compressed `"<type> <size>\0<content>"`.

mod enumerate;
pub mod prefix;
mod read;
mod stream;
mod write;

pub use enumerate::LooseObjectIter;
pub use prefix::resolve_short;
pub use stream::LooseObjectStream;

use git_hash::{HashAlgorithm, ObjectId};
use git_utils::FileCache;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Interface to the loose object directory (`.git/objects/`).
pub struct LooseObjectStore {
    /// Path to the objects directory.
    objects_dir: PathBuf,
    /// Hash algorithm in use.
    hash_algo: HashAlgorithm,
    /// Zlib compression level.
    compression_level: flate2::Compression,
    /// Shared cache of raw (still-deflated) file contents.
    file_cache: Arc<FileCache>,
}

impl LooseObjectStore {
    /// Open the loose object store at the given path, with its own private
    /// file cache. Suitable for standalone use and tests; a `Store` that
    /// also owns a `Packed` should use [`Self::with_file_cache`] so both
    /// share one cache.
    pub fn open(objects_dir: impl AsRef<Path>, hash_algo: HashAlgorithm) -> Self {
        Self::with_file_cache(objects_dir, hash_algo, Arc::new(FileCache::new()))
    }

    /// Open the loose object store, reading through the given shared file cache.
    pub fn with_file_cache(
        objects_dir: impl AsRef<Path>,
        hash_algo: HashAlgorithm,
        file_cache: Arc<FileCache>,
    ) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
            hash_algo,
            compression_level: flate2::Compression::default(),
            file_cache,
        }
    }

    /// Set the zlib compression level. Must be in `0..=9`.
    pub fn set_compression_level(&mut self, level: u32) -> Result<(), LooseError> {
        if level > 9 {
            return Err(LooseError::InvalidCompressionLevel(level));
        }
        self.compression_level = flate2::Compression::new(level);
        Ok(())
    }

    /// Get the hash algorithm in use.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Get the file path for a given OID.
    pub fn object_path(&self, oid: &ObjectId) -> PathBuf {
        self.objects_dir.join(oid.loose_path())
    }

    /// Get the objects directory this store reads and writes under.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }
}

/// Errors from loose object operations.
#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("corrupt loose object {oid}: {reason}")]
    Corrupt { oid: String, reason: String },

    #[error("decompression error for {oid}: {source}")]
    Decompress {
        oid: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("ambiguous object name: prefix '{prefix}' matches {count} objects")]
    Ambiguous { prefix: String, count: usize },

    #[error("invalid compression level {0}: must be in 0..=9")]
    InvalidCompressionLevel(u32),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("object parse error: {0}")]
    Object(#[from] git_object::ObjectError),

    #[error("hash error: {0}")]
    Hash(#[from] git_hash::HashError),

    #[error(transparent)]
    Util(#[from] git_utils::UtilError),
}
