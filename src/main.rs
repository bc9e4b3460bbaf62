mod author;
mod cli;
mod config;
mod constants;
mod contents;
mod git;
mod hooks;
mod ui;

use crate::cli::{Cli, Command, HookOperation};
use crate::config::Config;
use crate::contents::{ContentsError, FileContentsManager};
use crate::git::E2xRepo;
use crate::hooks::FileOperation;
use anyhow::{Context, Result, anyhow, bail};
use std::io::Read;
use std::path::{Path, PathBuf};

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    ui::set_verbose(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(root_dir) = cli.root_dir {
        config.root_dir = Some(root_dir);
    }
    if cli.no_hook {
        config.post_file_op_hook = None;
    } else if let Some(hook) = cli.hook {
        config.post_file_op_hook = Some(hook);
    }
    config.create_repo |= cli.create_repo;
    config.validate()?;
    debug!("{:?}", config);

    match cli.command {
        Command::Save { path, from } => {
            let content = match from {
                Some(file) => std::fs::read(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
                None => {
                    let mut content = Vec::new();
                    std::io::stdin()
                        .read_to_end(&mut content)
                        .context("failed to read content from stdin")?;
                    content
                }
            };
            let saved = contents_manager(&config)?
                .save(&path, &content)
                .map_err(http_error)?;
            info!("saved {} ({} bytes)", saved.path, saved.size);
        }
        Command::Rename { old_path, new_path } => {
            contents_manager(&config)?
                .rename_file(&old_path, &new_path)
                .map_err(http_error)?;
        }
        Command::Delete { path } => {
            contents_manager(&config)?
                .delete_file(&path)
                .map_err(http_error)?;
        }
        Command::Hook { operation } => {
            let operation = match operation {
                HookOperation::Save { path } => FileOperation::Save {
                    path: absolute(&path)?,
                },
                HookOperation::Rename { old_path, path } => FileOperation::Rename {
                    old_path: absolute(&old_path)?,
                    path: absolute(&path)?,
                },
                HookOperation::Delete { path } => FileOperation::Delete {
                    path: absolute(&path)?,
                },
            };
            contents_manager(&config)?
                .run_post_file_op_hook(&operation)
                .map_err(http_error)?;
        }
        Command::Commit { path, message, add } => {
            let path = absolute(&path)?;
            let Some(dir) = path.parent() else {
                bail!("cannot commit {}", path.display());
            };
            let repo = E2xRepo::open(dir, config.create_repo)?;
            if !add && repo.is_untracked(&path)? {
                warning!("{} is untracked, pass --add to stage it", path.display());
            }
            let oid = repo.commit(&path, message.as_deref(), add)?;
            info!("{}", oid);
        }
        Command::Status { dir } => print_status(&dir)?,
        Command::Init { dir } => {
            let repo = E2xRepo::open(&dir, true)?;
            status!("repository at {}", repo.root().display());
            status!("author {}", repo.author());
        }
    }

    Ok(())
}

fn contents_manager(config: &Config) -> Result<FileContentsManager> {
    Ok(FileContentsManager::new(config.root_dir()?, config.hook()?))
}

/// prefix contents errors with the status a server would answer with
fn http_error(e: ContentsError) -> anyhow::Error {
    anyhow!("[{}] {}", e.status_code(), e)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("failed to read current directory")?
            .join(path))
    }
}

/// print `git status --short` style lines
fn print_status(dir: &Path) -> Result<()> {
    let repo = E2xRepo::open(dir, false)?;
    let status = repo.status()?;
    if status.is_clean() {
        status!("nothing to commit in {}", repo.root().display());
        return Ok(());
    }

    let unstaged = repo.unstaged()?;
    let marker = |path: &String| {
        let staged = if status.staged.contains(path) { 'S' } else { ' ' };
        let dirty = if unstaged.contains(path) { 'U' } else { ' ' };
        format!("{staged}{dirty}")
    };

    for path in &status.new {
        info!("A {} {}", marker(path), path);
    }
    for path in &status.modified {
        info!("M {} {}", marker(path), path);
    }
    for path in &status.deleted {
        info!("D {} {}", marker(path), path);
    }
    Ok(())
}
