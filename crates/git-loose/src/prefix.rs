//! Short-hash resolution against loose objects.
//!
//! Only loose objects are searched here — packs keep their own index and are
//! never consulted for abbreviated names by this store.

use std::fs;

use git_hash::ObjectId;

use crate::{LooseError, LooseObjectStore};

impl LooseObjectStore {
    /// Resolve an abbreviated hex prefix against loose objects.
    ///
    /// Matches fan-out directories whose name is the first `min(prefix.len(), 2)`
    /// hex characters of `prefix`, then full object names within those
    /// directories that start with `prefix`. `Ok(None)` if nothing matches,
    /// `Ok(Some(oid))` if exactly one does, `Err(Ambiguous)` if more than one
    /// does.
    pub fn resolve_short(&self, prefix: &str) -> Result<Option<ObjectId>, LooseError> {
        let dir_prefix_len = prefix.len().min(2);
        let dir_prefix = &prefix[..dir_prefix_len];

        let mut candidates: Vec<ObjectId> = Vec::new();

        let entries = match fs::read_dir(&self.objects_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir_name = entry.file_name();
            let dir_name = dir_name.to_string_lossy();
            if dir_name.len() != 2 || !dir_name.chars().all(|c| c.is_ascii_hexdigit()) {
                continue;
            }
            if !dir_name.eq_ignore_ascii_case(dir_prefix) {
                continue;
            }

            for file in fs::read_dir(entry.path())? {
                let file = file?;
                if !file.file_type()?.is_file() {
                    continue;
                }
                let file_name = file.file_name();
                let file_name = file_name.to_string_lossy();
                if !file_name.chars().all(|c| c.is_ascii_hexdigit()) {
                    continue;
                }

                let hex = format!("{}{}", dir_name, file_name);
                let Ok(oid) = ObjectId::from_hex(&hex) else {
                    continue;
                };
                if oid.starts_with_hex(prefix) {
                    candidates.push(oid);
                }
            }
        }

        match candidates.len() {
            0 => Ok(None),
            1 => Ok(Some(candidates.remove(0))),
            count => Err(LooseError::Ambiguous {
                prefix: prefix.to_string(),
                count,
            }),
        }
    }
}
