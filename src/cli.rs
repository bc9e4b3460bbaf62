use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// e2x-git: commit every notebook save, rename and delete to git
#[derive(Parser, Debug)]
#[command(
    name = "e2x-git",
    about,
    long_about = None,
    disable_version_flag = true
)]
pub struct Cli {
    /// config file (defaults to <config dir>/e2x-git/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// directory api paths are resolved against
    #[arg(long, global = true)]
    pub root_dir: Option<PathBuf>,

    /// dotted name of the post file operation hook
    #[arg(long, global = true, conflicts_with = "no_hook")]
    pub hook: Option<String>,

    /// do not run any post file operation hook
    #[arg(long, global = true)]
    pub no_hook: bool,

    /// initialise a repository when a file is not under version control
    #[arg(long, global = true)]
    pub create_repo: bool,

    /// print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// write a file under the root dir and run the hook
    Save {
        /// api path relative to the root dir
        path: String,

        /// read content from this file instead of stdin
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// rename a file under the root dir and run the hook
    Rename { old_path: String, new_path: String },

    /// delete a file or directory under the root dir and run the hook
    Delete { path: String },

    /// run the hook for an operation that already happened on disk
    Hook {
        #[command(subcommand)]
        operation: HookOperation,
    },

    /// commit a single file to its repository
    Commit {
        path: PathBuf,

        /// commit message (derived from the file status when omitted)
        #[arg(short, long)]
        message: Option<String>,

        /// stage the file first if it is untracked
        #[arg(long)]
        add: bool,
    },

    /// show new, modified and deleted files
    Status {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// open or create the repository for a directory
    Init {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum HookOperation {
    Save { path: PathBuf },
    Rename { old_path: PathBuf, path: PathBuf },
    Delete { path: PathBuf },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
