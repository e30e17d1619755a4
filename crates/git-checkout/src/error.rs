use std::path::PathBuf;

use bstr::BString;
use git_hash::ObjectId;
use git_object::ObjectType;

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("tree entry {oid} expected to be a {expected}, found {actual}")]
    SchemaViolation {
        oid: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("object {0} not found")]
    ObjectNotFound(ObjectId),

    #[error("invalid path component: {0}")]
    InvalidPath(BString),

    #[error("io error at {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Index(#[from] git_index::IndexError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
