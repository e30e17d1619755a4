mod commands;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

#[derive(Parser)]
#[command(name = "gitr", about = "A Git implementation in Rust")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Run as if started in <path>
    #[arg(short = 'C', global = true)]
    directory: Option<PathBuf>,

    /// Directory to start repository discovery from
    #[arg(long = "root", env = "GITODB_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Set the path to the .git directory
    #[arg(long = "git-dir", env = "GITODB_DOT_GIT", global = true)]
    git_dir: Option<PathBuf>,

    /// Zlib compression level for loose objects (0-9)
    #[arg(long = "compression-level", env = "GITODB_LEVEL", global = true)]
    compression_level: Option<u32>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("fatal: cannot change to '{}': {}", dir.display(), e);
            process::exit(128);
        }
    }

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("fatal: {e}");
            process::exit(128);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    commands::run(cli)
}
