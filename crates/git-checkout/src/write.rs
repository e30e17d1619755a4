//! Materializing a [`PathTree`] onto disk and reconciling it with the index.

use std::path::{Path, PathBuf};

use bstr::{BString, ByteSlice, ByteVec};
use git_hash::ObjectId;
use git_index::{EntryFlags, Index, IndexEntry, Stage, StatData};
use git_object::FileMode;
use git_odb::Store;

use crate::tree::{load_filesystem, PathTree};
use crate::CheckoutError;

/// Maximum number of attempts [`create_file`] makes before surfacing the
/// underlying I/O error.
const MAX_WRITE_ATTEMPTS: usize = 10;

/// Walk `tree` in left-to-right tree order, invoking `f` for each blob leaf.
///
/// `f` receives `(i, total)` (1-based position and the total leaf count from
/// [`load_filesystem`]), the path components from the tree root, the file
/// mode, the blob's OID, and its content.
pub fn iter_blobs<F>(tree: &PathTree, total: usize, mut f: F) -> Result<(), CheckoutError>
where
    F: FnMut((usize, usize), &[BString], FileMode, ObjectId, &[u8]) -> Result<(), CheckoutError>,
{
    let mut i = 0usize;
    let mut path = Vec::new();
    walk(tree, total, &mut i, &mut path, &mut f)
}

fn walk<F>(
    node: &PathTree,
    total: usize,
    i: &mut usize,
    path: &mut Vec<BString>,
    f: &mut F,
) -> Result<(), CheckoutError>
where
    F: FnMut((usize, usize), &[BString], FileMode, ObjectId, &[u8]) -> Result<(), CheckoutError>,
{
    match node {
        PathTree::Dir(children) => {
            for (name, child) in children {
                path.push(name.clone());
                walk(child, total, i, path, f)?;
                path.pop();
            }
            Ok(())
        }
        PathTree::File(leaf) => {
            *i += 1;
            f((*i, total), path, leaf.mode, leaf.oid, &leaf.data)
        }
    }
}

/// Write `blob` at `file`, honoring `mode` (symlink for `Link`, chmod 0o755
/// for `Exec`). Retries the write up to [`MAX_WRITE_ATTEMPTS`] times,
/// unlinking the target between attempts.
pub fn create_file(file: &Path, mode: FileMode, blob: &[u8]) -> Result<(), CheckoutError> {
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(file, e))?;
    }

    if mode == FileMode::Symlink {
        return create_symlink(file, blob);
    }

    let mut attempts_left = MAX_WRITE_ATTEMPTS;
    loop {
        match write_atomic(file, blob) {
            Ok(()) => break,
            Err(e) if attempts_left > 1 => {
                tracing::warn!(path = %file.display(), error = %e, "checkout write failed, retrying");
                let _ = std::fs::remove_file(file);
                attempts_left -= 1;
            }
            Err(e) => return Err(io_err(file, e)),
        }
    }

    if mode == FileMode::Executable {
        chmod_exec(file)?;
    }

    Ok(())
}

#[cfg(unix)]
fn create_symlink(file: &Path, blob: &[u8]) -> Result<(), CheckoutError> {
    let target = blob.to_str().map_err(|_| CheckoutError::InvalidPath(BString::from(blob)))?;
    let _ = std::fs::remove_file(file);
    std::os::unix::fs::symlink(target, file).map_err(|e| io_err(file, e))
}

#[cfg(not(unix))]
fn create_symlink(file: &Path, blob: &[u8]) -> Result<(), CheckoutError> {
    tracing::warn!(path = %file.display(), "platform has no symlink support, writing blob as regular file");
    write_atomic(file, blob).map_err(|e| io_err(file, e))
}

#[cfg(unix)]
fn chmod_exec(file: &Path) -> Result<(), CheckoutError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(file, std::fs::Permissions::from_mode(0o755)).map_err(|e| io_err(file, e))
}

#[cfg(not(unix))]
fn chmod_exec(_file: &Path) -> Result<(), CheckoutError> {
    Ok(())
}

fn write_atomic(file: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut tmp = git_utils::tempfile::TempFile::new_for(file)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    std::io::Write::write_all(&mut tmp, content)?;
    tmp.persist(file).map_err(|e| std::io::Error::other(e.to_string()))
}

fn io_err(path: &Path, source: std::io::Error) -> CheckoutError {
    CheckoutError::IoFailure {
        path: path.to_path_buf(),
        source,
    }
}

/// Reconcile a single file against the index: write it if missing, changed,
/// or its on-disk stat data no longer matches, otherwise leave it untouched.
///
/// `root` is the working tree root; `file` is the absolute path to the file.
/// Returns `None` (logging a warning) on any filesystem or codec error, so a
/// single bad entry doesn't abort the whole checkout.
pub fn entry_of_file(
    root: &Path,
    index: &Index,
    file: &Path,
    mode: FileMode,
    blob_hash: ObjectId,
    blob: &[u8],
) -> Option<IndexEntry> {
    match entry_of_file_inner(root, index, file, mode, blob_hash, blob) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::warn!(path = %file.display(), error = %e, "skipping index entry");
            None
        }
    }
}

fn entry_of_file_inner(
    root: &Path,
    index: &Index,
    file: &Path,
    mode: FileMode,
    blob_hash: ObjectId,
    blob: &[u8],
) -> Result<Option<IndexEntry>, CheckoutError> {
    let name = relative_name(root, file)?;

    if !file.exists() {
        create_file(file, mode, blob)?;
    } else {
        let canonical = std::fs::canonicalize(file).map_err(|e| io_err(file, e))?;
        let existing = index.iter().find(|e| {
            root.join(e.path.to_str_lossy().as_ref())
                .canonicalize()
                .map(|p| p == canonical)
                .unwrap_or(false)
        });

        let needs_write = match existing {
            None => true,
            Some(entry) => {
                if entry.oid != blob_hash {
                    true
                } else {
                    let meta = std::fs::symlink_metadata(file).map_err(|e| io_err(file, e))?;
                    !entry.stat.matches(&meta)
                }
            }
        };

        if needs_write {
            create_file(file, mode, blob)?;
        }
    }

    let meta = std::fs::symlink_metadata(file).map_err(|e| io_err(file, e))?;
    Ok(Some(IndexEntry {
        path: name,
        oid: blob_hash,
        mode,
        stage: Stage::Normal,
        stat: StatData::from_metadata(&meta),
        flags: EntryFlags::default(),
    }))
}

fn relative_name(root: &Path, file: &Path) -> Result<BString, CheckoutError> {
    let rel = file
        .strip_prefix(root)
        .map_err(|_| CheckoutError::InvalidPath(BString::from(file.to_string_lossy().as_bytes())))?;
    let mut name = BString::from(Vec::new());
    for (i, component) in rel.components().enumerate() {
        if i > 0 {
            name.push_byte(b'/');
        }
        name.extend_from_slice(component.as_os_str().to_string_lossy().as_bytes());
    }
    Ok(name)
}

/// Build the on-disk file path for a blob at `path_components` under `root`.
fn file_path(root: &Path, path_components: &[BString]) -> PathBuf {
    let mut p = root.to_path_buf();
    for component in path_components {
        p.push(component.to_str_lossy().as_ref());
    }
    p
}

/// Serialize `maybe_index` to the index file atomically, or build a fresh
/// index from `head`'s tree via [`load_filesystem`] + [`iter_blobs`].
pub fn write_index(
    odb: &Store,
    root: &Path,
    index_path: &Path,
    maybe_index: Option<Index>,
    head: &ObjectId,
) -> Result<Index, CheckoutError> {
    let index = match maybe_index {
        Some(idx) => idx,
        None => {
            let current = if index_path.exists() {
                Index::read_from(index_path)?
            } else {
                Index::new()
            };

            let (total, tree) = load_filesystem(odb, head)?;
            let mut new_index = Index::new();

            iter_blobs(&tree, total, |_progress, path_components, mode, oid, data| {
                let file = file_path(root, path_components);
                if let Some(entry) = entry_of_file(root, &current, &file, mode, oid, data) {
                    new_index.add(entry);
                }
                Ok(())
            })?;

            new_index
        }
    };

    index.write_to(index_path)?;
    Ok(index)
}
