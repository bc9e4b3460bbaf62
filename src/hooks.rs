use crate::constants::{GIT_COMMIT_HOOK, POST_SAVE_COMMIT_HOOK};
use crate::git::{E2xRepo, RepoError};
use crate::{debug, status};
use anyhow::{Result, bail};
use git2::Oid;
use std::fmt;
use std::path::{Path, PathBuf};

pub const HOOK_NAMES: [&str; 2] = [GIT_COMMIT_HOOK, POST_SAVE_COMMIT_HOOK];

/// a file operation performed by the contents manager, paths absolute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    Save { path: PathBuf },
    Rename { old_path: PathBuf, path: PathBuf },
    Delete { path: PathBuf },
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Save { path } => write!(f, "save {}", path.display()),
            Self::Rename { old_path, path } => {
                write!(f, "rename {} → {}", old_path.display(), path.display())
            }
            Self::Delete { path } => write!(f, "delete {}", path.display()),
        }
    }
}

/// called by the contents manager after every file operation
pub trait PostFileOpHook {
    fn name(&self) -> &'static str;

    fn run(&self, operation: &FileOperation) -> Result<()>;
}

/// look up a hook by its dotted name
pub fn hook_by_name(name: &str, create_if_missing: bool) -> Result<Box<dyn PostFileOpHook>> {
    match name {
        GIT_COMMIT_HOOK => Ok(Box::new(GitCommitHook::new(create_if_missing))),
        POST_SAVE_COMMIT_HOOK => Ok(Box::new(PostSaveCommitHook(GitCommitHook::new(
            create_if_missing,
        )))),
        other => bail!(
            "post_file_op_hook must name a registered hook, got {:?} (known: {})",
            other,
            HOOK_NAMES.join(", ")
        ),
    }
}

/// commits every saved, renamed or deleted file to its enclosing repository
pub struct GitCommitHook {
    create_if_missing: bool,
}

impl GitCommitHook {
    pub fn new(create_if_missing: bool) -> Self {
        Self { create_if_missing }
    }

    /// commit the effect of an operation, returning the commits made
    ///
    /// renames git already sees as staged become one commit; otherwise the
    /// old path's removal and the new path's addition are committed apart
    pub fn dispatch(&self, operation: &FileOperation) -> Result<Vec<Oid>> {
        match operation {
            FileOperation::Save { path } | FileOperation::Delete { path } => {
                Ok(self.commit_change(path)?.into_iter().collect())
            }
            FileOperation::Rename { old_path, path } => self.commit_rename(old_path, path),
        }
    }

    /// one commit when git already has the rename staged, otherwise the
    /// old path's removal followed by the new path's addition
    fn commit_rename(&self, old_path: &Path, path: &Path) -> Result<Vec<Oid>> {
        let repo = self.open_repo(path);
        // the old path is only reused from this repository when it lives there
        let old_in_repo = repo
            .as_ref()
            .and_then(|repo| repo.relative_path(old_path).ok());

        if let Some(repo) = &repo
            && repo.is_staged(path)?
        {
            let new = repo.relative_path(path)?;
            let old = match old_in_repo {
                Some(old) if repo.is_tracked(&old)? => old,
                _ => {
                    // moved in from elsewhere: settle the old side on its own
                    let mut commits = Vec::new();
                    if repo.relative_path(old_path).is_err() {
                        commits.extend(self.commit_change(old_path)?);
                    }
                    commits.extend(commit_in(repo, path)?);
                    return Ok(commits);
                }
            };

            let oid = repo.commit_paths(
                &[old.as_str(), new.as_str()],
                &format!("Rename {old} to {new}"),
            )?;
            status!("committed rename {} → {}", old, new);
            return Ok(vec![oid]);
        }

        let mut commits = Vec::new();
        match &repo {
            Some(repo) if old_in_repo.is_some() => commits.extend(commit_in(repo, old_path)?),
            // same directory, already reported as not under version control
            None if existing_parent(old_path) == existing_parent(path) => {}
            _ => commits.extend(self.commit_change(old_path)?),
        }
        if let Some(repo) = &repo {
            commits.extend(commit_in(repo, path)?);
        }
        Ok(commits)
    }

    /// commit whatever happened to a single path, staging it if new
    fn commit_change(&self, path: &Path) -> Result<Option<Oid>> {
        match self.open_repo(path) {
            Some(repo) => commit_in(&repo, path),
            None => Ok(None),
        }
    }

    /// open the repository for a path, `None` if it is not under version control
    fn open_repo(&self, path: &Path) -> Option<E2xRepo> {
        let dir = existing_parent(path)?;
        match E2xRepo::open(&dir, self.create_if_missing) {
            Ok(repo) => Some(repo),
            Err(e) => {
                status!("no repository found for {}, skipping commit ({})", path.display(), e);
                None
            }
        }
    }
}

impl PostFileOpHook for GitCommitHook {
    fn name(&self) -> &'static str {
        GIT_COMMIT_HOOK
    }

    fn run(&self, operation: &FileOperation) -> Result<()> {
        let commits = self.dispatch(operation)?;
        debug!("{} produced {} commit(s)", operation, commits.len());
        Ok(())
    }
}

/// only reacts to saves
pub struct PostSaveCommitHook(GitCommitHook);

impl PostFileOpHook for PostSaveCommitHook {
    fn name(&self) -> &'static str {
        POST_SAVE_COMMIT_HOOK
    }

    fn run(&self, operation: &FileOperation) -> Result<()> {
        match operation {
            FileOperation::Save { .. } => self.0.run(operation),
            _ => Ok(()),
        }
    }
}

/// commit a path in an already opened repository, skipping clean paths
fn commit_in(repo: &E2xRepo, path: &Path) -> Result<Option<Oid>> {
    match repo.commit(path, None, true) {
        Ok(oid) => {
            status!("committed {}", path.display());
            Ok(Some(oid))
        }
        Err(RepoError::NothingToCommit(relative)) => {
            debug!("no changes to commit for {}", relative);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// nearest existing directory containing `path`
fn existing_parent(path: &Path) -> Option<PathBuf> {
    path.ancestors().skip(1).find(|dir| dir.is_dir()).map(Path::to_path_buf)
}
