//! Tree materialization and index reconciliation.
//!
//! Builds the working tree from a commit's tree object and keeps the index
//! in sync with it, skipping files whose stat data shows no change.

mod error;
mod tree;
mod write;

pub use error::CheckoutError;
pub use tree::{load_filesystem, Leaf, PathTree};
pub use write::{create_file, entry_of_file, iter_blobs, write_index};
