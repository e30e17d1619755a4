//! Revision string resolution shared by the plumbing commands.
//!
//! Supports full/short hex object ids, ref names (tried as given, then under
//! `refs/heads/`, `refs/tags/`, `refs/remotes/`, and `refs/`), and `REV~N`/`REV^N`
//! parent-chasing suffixes.

use anyhow::{bail, Result};
use git_hash::ObjectId;
use git_object::Object;
use git_ref::{RefName, RefStore};
use git_repository::Repository;

/// Resolve a revision string to an object id.
pub fn resolve_revision(repo: &Repository, rev: &str) -> Result<ObjectId> {
    let rev = rev.trim();
    if rev.is_empty() {
        bail!("empty revision");
    }

    if let Some((base, suffix)) = split_suffix(rev) {
        let oid = resolve_revision(repo, base)?;
        return apply_suffix(repo, &oid, suffix);
    }

    if rev.len() >= 4 && rev.chars().all(|c| c.is_ascii_hexdigit()) {
        if (rev.len() == 40 || rev.len() == 64) && ObjectId::from_hex(rev).is_ok() {
            return Ok(ObjectId::from_hex(rev)?);
        }
        if let Ok(oid) = repo.odb().resolve_prefix(rev) {
            return Ok(oid);
        }
    }

    for candidate in ref_candidates(rev) {
        if let Ok(name) = RefName::new(candidate.as_str()) {
            if let Some(oid) = repo.refs().resolve_to_oid(&name)? {
                return Ok(oid);
            }
        }
    }

    bail!("cannot resolve '{}'", rev)
}

fn ref_candidates(rev: &str) -> Vec<String> {
    vec![
        rev.to_string(),
        format!("refs/heads/{}", rev),
        format!("refs/tags/{}", rev),
        format!("refs/remotes/{}", rev),
        format!("refs/{}", rev),
    ]
}

fn split_suffix(rev: &str) -> Option<(&str, &str)> {
    for (i, c) in rev.char_indices().rev() {
        if (c == '~' || c == '^') && i > 0 {
            let rest = &rev[i + 1..];
            if rest.is_empty() || rest.chars().all(|c| c.is_ascii_digit()) {
                return Some((&rev[..i], &rev[i..]));
            }
        }
    }
    None
}

fn apply_suffix(repo: &Repository, oid: &ObjectId, suffix: &str) -> Result<ObjectId> {
    let (op, count_str) = suffix.split_at(1);
    let count: usize = if count_str.is_empty() {
        1
    } else {
        count_str
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid suffix: {}", suffix))?
    };

    match op {
        "~" => {
            let mut current = *oid;
            for _ in 0..count {
                current = first_parent(repo, &current)?
                    .ok_or_else(|| anyhow::anyhow!("{}~{} goes past root", oid, count))?;
            }
            Ok(current)
        }
        "^" => {
            if count == 0 {
                return Ok(*oid);
            }
            let commit = read_commit(repo, oid)?;
            commit
                .parents
                .get(count - 1)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("{}^{} has no such parent", oid, count))
        }
        _ => bail!("unknown suffix: {}", suffix),
    }
}

fn first_parent(repo: &Repository, oid: &ObjectId) -> Result<Option<ObjectId>> {
    Ok(read_commit(repo, oid)?.parents.first().copied())
}

fn read_commit(repo: &Repository, oid: &ObjectId) -> Result<git_object::Commit> {
    match repo
        .odb()
        .read(oid)?
        .ok_or_else(|| anyhow::anyhow!("object {} not found", oid))?
    {
        Object::Commit(c) => Ok(c),
        _ => bail!("{} is not a commit", oid),
    }
}
