//! Building a [`PathTree`] from a commit and walking it in tree order.

use bstr::BString;
use git_hash::ObjectId;
use git_object::{FileMode, Object, ObjectType};
use git_odb::Store;

use crate::CheckoutError;

/// A blob leaf: its mode, OID, and inflated content.
pub struct Leaf {
    pub mode: FileMode,
    pub oid: ObjectId,
    pub data: Vec<u8>,
}

/// A tree of directory entries mirroring a commit's tree object.
///
/// Internal nodes preserve on-disk tree order; leaves carry the blob content
/// so a later traversal never has to re-read the object database.
pub enum PathTree {
    Dir(Vec<(BString, PathTree)>),
    File(Leaf),
}

/// Read `commit_hash`'s tree and materialize it into a [`PathTree`].
///
/// Returns the total number of blob leaves alongside the tree, so callers
/// can report traversal progress without a second pass.
pub fn load_filesystem(
    odb: &Store,
    commit_hash: &ObjectId,
) -> Result<(usize, PathTree), CheckoutError> {
    let commit = match odb.read(commit_hash)?.ok_or(CheckoutError::ObjectNotFound(*commit_hash))? {
        Object::Commit(c) => c,
        other => {
            return Err(CheckoutError::SchemaViolation {
                oid: *commit_hash,
                expected: ObjectType::Commit,
                actual: other.object_type(),
            })
        }
    };

    let mut count = 0usize;
    let tree = load_tree(odb, &commit.tree, &mut count)?;
    Ok((count, tree))
}

fn load_tree(odb: &Store, tree_oid: &ObjectId, count: &mut usize) -> Result<PathTree, CheckoutError> {
    let tree = match odb.read(tree_oid)?.ok_or(CheckoutError::ObjectNotFound(*tree_oid))? {
        Object::Tree(t) => t,
        other => {
            return Err(CheckoutError::SchemaViolation {
                oid: *tree_oid,
                expected: ObjectType::Tree,
                actual: other.object_type(),
            })
        }
    };

    let mut nodes = Vec::with_capacity(tree.entries.len());
    for entry in tree.entries.iter() {
        let node = if entry.mode.is_tree() {
            load_tree(odb, &entry.oid, count)?
        } else {
            let data = match odb.read(&entry.oid)?.ok_or(CheckoutError::ObjectNotFound(entry.oid))? {
                Object::Blob(b) => b.data,
                other => {
                    return Err(CheckoutError::SchemaViolation {
                        oid: entry.oid,
                        expected: ObjectType::Blob,
                        actual: other.object_type(),
                    })
                }
            };
            *count += 1;
            PathTree::File(Leaf {
                mode: entry.mode,
                oid: entry.oid,
                data,
            })
        };
        nodes.push((entry.name.clone(), node));
    }

    Ok(PathTree::Dir(nodes))
}
