pub mod cat_file;
pub mod check_ref_format;
pub mod checkout;
pub mod commit_tree;
pub mod hash_object;
pub mod init;
pub mod ls_tree;
pub mod restore;
pub mod rev_parse;
pub mod revision;
pub mod show_ref;
pub mod switch;
pub mod symbolic_ref;
pub mod update_ref;
pub mod write_tree;

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Provide content or type and size information for repository objects
    CatFile(cat_file::CatFileArgs),
    /// Compute object ID and optionally create a blob from a file
    HashObject(hash_object::HashObjectArgs),
    /// Pick out and massage parameters
    RevParse(rev_parse::RevParseArgs),
    /// Update the object name stored in a ref safely
    UpdateRef(update_ref::UpdateRefArgs),
    /// List references in a local repository
    ShowRef(show_ref::ShowRefArgs),
    /// Read, modify and delete symbolic refs
    SymbolicRef(symbolic_ref::SymbolicRefArgs),
    /// List the contents of a tree object
    LsTree(ls_tree::LsTreeArgs),
    /// Ensure that a reference name is well formed
    CheckRefFormat(check_ref_format::CheckRefFormatArgs),
    /// Create a tree object from the current index
    WriteTree(write_tree::WriteTreeArgs),
    /// Create a new commit object
    CommitTree(commit_tree::CommitTreeArgs),
    /// Create an empty Git repository or reinitialize an existing one
    Init(init::InitArgs),
    /// Restore working tree files
    Restore(restore::RestoreArgs),
    /// Switch branches
    Switch(switch::SwitchArgs),
    /// Switch branches or restore working tree files
    Checkout(checkout::CheckoutArgs),
}

/// Open a repository, respecting --git-dir, --root, and --compression-level.
pub fn open_repo(cli: &Cli) -> Result<git_repository::Repository> {
    let opts = git_repository::RepoOptions {
        compression_level: cli.compression_level,
    };
    let start = cli.root.as_deref().unwrap_or_else(|| Path::new("."));
    let repo = if let Some(ref git_dir) = cli.git_dir {
        git_repository::Repository::open_with_options(git_dir, &opts)?
    } else {
        git_repository::Repository::discover_with_options(start, &opts)?
    };
    Ok(repo)
}

pub fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::CatFile(args) => cat_file::run(args, &cli),
        Commands::HashObject(args) => hash_object::run(args, &cli),
        Commands::RevParse(args) => rev_parse::run(args, &cli),
        Commands::UpdateRef(args) => update_ref::run(args, &cli),
        Commands::ShowRef(args) => show_ref::run(args, &cli),
        Commands::SymbolicRef(args) => symbolic_ref::run(args, &cli),
        Commands::LsTree(args) => ls_tree::run(args, &cli),
        Commands::CheckRefFormat(args) => check_ref_format::run(args),
        Commands::WriteTree(args) => write_tree::run(args, &cli),
        Commands::CommitTree(args) => commit_tree::run(args, &cli),
        Commands::Init(args) => init::run(args, &cli),
        Commands::Restore(args) => restore::run(args, &cli),
        Commands::Switch(args) => switch::run(args, &cli),
        Commands::Checkout(args) => checkout::run(args, &cli),
    }
}
