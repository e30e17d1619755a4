use std::io::{self, Write};

use anyhow::{bail, Result};
use bstr::{BString, ByteSlice};
use clap::Args;
use git_hash::ObjectId;
use git_ref::{RefName, RefStore};

use crate::Cli;
use super::open_repo;
use super::revision::resolve_revision;

#[derive(Args)]
pub struct SwitchArgs {
    /// Create a new branch and switch to it
    #[arg(long, value_name = "new-branch")]
    pub create: Option<String>,

    /// Create or reset a branch and switch to it
    #[arg(long, value_name = "new-branch")]
    pub force_create: Option<String>,

    /// Switch to a commit without creating a branch
    #[arg(long)]
    pub detach: bool,

    /// Force switch (discard local changes)
    #[arg(short, long)]
    pub force: bool,

    /// Branch or commit to switch to
    pub target: Option<String>,
}

pub fn run(args: &SwitchArgs, cli: &Cli) -> Result<i32> {
    let mut repo = open_repo(cli)?;

    let stderr = io::stderr();
    let mut err = stderr.lock();

    // Handle -c (create and switch)
    if let Some(ref new_branch) = args.create {
        let start = args.target.as_deref().unwrap_or("HEAD");
        let oid = resolve_revision(&repo, start)?;

        let refname = RefName::new(BString::from(format!("refs/heads/{}", new_branch)))?;
        if repo.refs().resolve(&refname)?.is_some() {
            bail!("fatal: a branch named '{}' already exists", new_branch);
        }

        repo.refs().write_ref(&refname, &oid)?;
        switch_to_branch(&mut repo, new_branch, &oid, args.force)?;
        writeln!(err, "Switched to a new branch '{}'", new_branch)?;
        return Ok(0);
    }

    // Handle -C (force create and switch)
    if let Some(ref new_branch) = args.force_create {
        let start = args.target.as_deref().unwrap_or("HEAD");
        let oid = resolve_revision(&repo, start)?;

        let refname = RefName::new(BString::from(format!("refs/heads/{}", new_branch)))?;
        repo.refs().write_ref(&refname, &oid)?;
        switch_to_branch(&mut repo, new_branch, &oid, args.force)?;
        writeln!(err, "Switched to a new branch '{}'", new_branch)?;
        return Ok(0);
    }

    let target = args.target.as_deref()
        .ok_or_else(|| anyhow::anyhow!("missing branch or commit argument"))?;

    if args.detach {
        let oid = resolve_revision(&repo, target)?;
        switch_to_detached(&mut repo, &oid, args.force)?;
        writeln!(err, "HEAD is now at {} {}", &oid.to_hex()[..7], target)?;
        return Ok(0);
    }

    // Try to switch to an existing branch
    let refname = RefName::new(BString::from(format!("refs/heads/{}", target)))?;
    if let Some(reference) = repo.refs().resolve(&refname)? {
        let oid = reference.peel_to_oid(repo.refs())?;
        switch_to_branch(&mut repo, target, &oid, args.force)?;
        writeln!(err, "Switched to branch '{}'", target)?;
        Ok(0)
    } else {
        bail!("fatal: invalid reference: {}", target);
    }
}

fn switch_to_branch(
    repo: &mut git_repository::Repository,
    branch: &str,
    oid: &ObjectId,
    _force: bool,
) -> Result<()> {
    // Update working tree
    checkout_commit(repo, oid)?;

    // Update HEAD to point to the branch
    let head = RefName::new(BString::from("HEAD"))?;
    let branch_ref = RefName::new(BString::from(format!("refs/heads/{}", branch)))?;
    repo.refs().write_symbolic_ref(&head, &branch_ref)?;

    Ok(())
}

fn switch_to_detached(
    repo: &mut git_repository::Repository,
    oid: &ObjectId,
    _force: bool,
) -> Result<()> {
    checkout_commit(repo, oid)?;

    let head = RefName::new(BString::from("HEAD"))?;
    repo.refs().write_ref(&head, oid)?;

    Ok(())
}

fn checkout_commit(repo: &mut git_repository::Repository, oid: &ObjectId) -> Result<()> {
    let work_tree = repo
        .work_tree()
        .ok_or_else(|| anyhow::anyhow!("cannot switch in a bare repository"))?
        .to_path_buf();

    // Paths present before the switch, so files dropped from the target tree
    // get pruned from the working tree below.
    let old_paths: std::collections::HashSet<BString> = {
        let index = repo.index()?;
        index.iter().map(|e| e.path.clone()).collect()
    };

    let index_path = repo.git_dir().join("index");
    let new_index = git_checkout::write_index(repo.odb(), &work_tree, &index_path, None, oid)?;

    let new_paths: std::collections::HashSet<BString> =
        new_index.iter().map(|e| e.path.clone()).collect();

    for old_path in &old_paths {
        if !new_paths.contains(old_path) {
            let fs_path = work_tree.join(old_path.to_str_lossy().as_ref());
            if fs_path.exists() {
                let _ = std::fs::remove_file(&fs_path);
            }
        }
    }

    repo.set_index(new_index);

    Ok(())
}
