use crate::author::{self, Author, AuthorSource};
use crate::constants::{GIT_TIMEOUT_SECS, GITIGNORE_FILE, GITIGNORE_TEMPLATE};
use crate::{debug, warning};
use git2::{ErrorCode, Oid, Repository, Signature, Status as GitStatus, StatusOptions};
use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use thiserror::Error;
use wait_timeout::ChildExt;

/// errors raised by repository operations
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{} does not exist or is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("{} is not a valid repository", .0.display())]
    NotARepository(PathBuf),

    #[error("{} is a bare repository", .0.display())]
    BareRepository(PathBuf),

    #[error("{} is outside the repository at {}", .path.display(), .root.display())]
    OutsideRepository { path: PathBuf, root: PathBuf },

    #[error("the file {0} is currently untracked")]
    Untracked(String),

    #[error("nothing to commit for {0}")]
    NothingToCommit(String),

    #[error("git {command} failed: {message}")]
    GitCommand { command: String, message: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RepoError>;

const INDEX_CHANGES: GitStatus = GitStatus::INDEX_NEW
    .union(GitStatus::INDEX_MODIFIED)
    .union(GitStatus::INDEX_DELETED)
    .union(GitStatus::INDEX_RENAMED)
    .union(GitStatus::INDEX_TYPECHANGE);

/// status of a single path relative to HEAD, index and working tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    New,
    Modified,
    Deleted,
}

impl FileStatus {
    /// leading word of the derived commit message
    pub fn verb(self) -> &'static str {
        match self {
            Self::New => "Add",
            Self::Modified => "Update",
            Self::Deleted => "Delete",
        }
    }

    /// default commit message for a path with this status
    pub fn message(self, path: &str) -> String {
        format!("{} {}", self.verb(), path)
    }
}

/// repository status, paths relative to the working tree root
///
/// `new`, `modified` and `deleted` are disjoint. `staged` holds every path
/// whose index entry differs from HEAD and overlaps the other three.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Status {
    pub new: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub staged: BTreeSet<String>,
}

impl Status {
    pub fn is_clean(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// classify a path, aggregating entries below it when it names a directory
    pub fn classify(&self, path: &str) -> Option<FileStatus> {
        if self.new.contains(path) {
            return Some(FileStatus::New);
        }
        if self.modified.contains(path) {
            return Some(FileStatus::Modified);
        }
        if self.deleted.contains(path) {
            return Some(FileStatus::Deleted);
        }

        let below = |set: &BTreeSet<String>| set.iter().filter(|p| is_within(p, path)).count();
        let (new, modified, deleted) = (below(&self.new), below(&self.modified), below(&self.deleted));
        match (new, modified, deleted) {
            (0, 0, 0) => None,
            (_, 0, 0) => Some(FileStatus::New),
            (0, 0, _) => Some(FileStatus::Deleted),
            _ => Some(FileStatus::Modified),
        }
    }
}

/// whether `path` is `dir` itself or lies below it
fn is_within(path: &str, dir: &str) -> bool {
    dir == "." || path == dir || path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

/// a git repository enclosing a working directory
pub struct E2xRepo {
    path: PathBuf,
    root: PathBuf,
    repo: Repository,
    author: Author,
}

impl E2xRepo {
    /// open the repository enclosing `path`, searching parent directories
    ///
    /// when no repository is found and `create_if_missing` is set, a new one
    /// is initialised at `path` with a committed `.gitignore`
    pub fn open(path: &Path, create_if_missing: bool) -> Result<Self> {
        if !path.is_dir() {
            return Err(RepoError::NotADirectory(path.to_path_buf()));
        }
        let path = path.canonicalize()?;

        let (repo, created) = match Repository::discover(&path) {
            Ok(repo) => (repo, false),
            Err(e) if e.code() == ErrorCode::NotFound => {
                if !create_if_missing {
                    return Err(RepoError::NotARepository(path));
                }
                debug!("initialising repository at {}", path.display());
                (Repository::init(&path)?, true)
            }
            Err(e) => return Err(e.into()),
        };

        let root = repo
            .workdir()
            .ok_or_else(|| RepoError::BareRepository(path.clone()))?
            .canonicalize()?;
        let author = author::resolve(&repo);

        let e2x_repo = Self {
            path,
            root,
            repo,
            author,
        };
        if created {
            e2x_repo.create_gitignore()?;
        }
        Ok(e2x_repo)
    }

    /// canonical working tree root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// identity used for every commit made through this repository
    pub fn author(&self) -> &Author {
        &self.author
    }

    /// path relative to the working tree root, `/` separated
    ///
    /// relative inputs are taken from the directory the repository was
    /// opened on. the root itself is returned as `.`
    pub fn relative_path(&self, path: &Path) -> Result<String> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.path.join(path)
        };
        let resolved = canonicalize_lenient(&joined);
        let relative = resolved
            .strip_prefix(&self.root)
            .map_err(|_| RepoError::OutsideRepository {
                path: resolved.clone(),
                root: self.root.clone(),
            })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            Ok(".".to_string())
        } else {
            Ok(parts.join("/"))
        }
    }

    /// compute new, modified, deleted and staged paths
    pub fn status(&self) -> Result<Status> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;

        let mut status = Status::default();
        for entry in statuses.iter() {
            let flags = entry.status();
            if flags.is_ignored() {
                continue;
            }
            let Some(path) = entry.path() else {
                warning!("skipping non utf-8 path in repository status");
                continue;
            };
            let path = path.trim_end_matches('/').to_string();

            let staged = flags.intersects(INDEX_CHANGES);
            if staged {
                status.staged.insert(path.clone());
            }

            if flags.is_wt_new() && !staged {
                status.new.insert(path);
            } else if self.root.join(&path).symlink_metadata().is_ok() {
                status.modified.insert(path);
            } else {
                status.deleted.insert(path);
            }
        }

        Ok(status)
    }

    /// paths whose working tree content differs from the index
    pub fn unstaged(&self) -> Result<Vec<String>> {
        let diff = self.repo.diff_index_to_workdir(None, None)?;
        Ok(diff
            .deltas()
            .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
            .map(|path| path.to_string_lossy().into_owned())
            .collect())
    }

    /// status of a single path, `None` when it has no pending changes
    pub fn file_status(&self, path: &Path) -> Result<Option<FileStatus>> {
        let relative = self.relative_path(path)?;
        Ok(self.status()?.classify(&relative))
    }

    /// whether the path is on disk but absent from the index
    pub fn is_untracked(&self, path: &Path) -> Result<bool> {
        let relative = self.relative_path(path)?;
        Ok(self.status()?.new.contains(&relative))
    }

    /// whether the path's index entry differs from HEAD
    pub fn is_staged(&self, path: &Path) -> Result<bool> {
        let relative = self.relative_path(path)?;
        Ok(self.status()?.staged.contains(&relative))
    }

    /// stage a path if it is untracked, returning whether anything was staged
    pub fn add(&self, path: &Path) -> Result<bool> {
        let relative = self.relative_path(path)?;
        let status = self.status()?;
        let untracked: Vec<&str> = status
            .new
            .iter()
            .filter(|p| is_within(p, &relative))
            .map(String::as_str)
            .collect();
        if untracked.is_empty() {
            return Ok(false);
        }
        self.stage(&untracked)?;
        Ok(true)
    }

    /// commit a single path, staging it first when untracked and allowed
    ///
    /// without a message one is derived from the path's status, e.g.
    /// `Add notebooks/intro.ipynb`
    ///
    /// when the commit fails, files staged here are taken out of the index
    /// again so a later delete does not find them half tracked
    pub fn commit(&self, path: &Path, message: Option<&str>, add_if_untracked: bool) -> Result<Oid> {
        let relative = self.relative_path(path)?;
        let mut status = self.status()?;
        if self.drop_orphaned(&status, &relative)? {
            status = self.status()?;
        }
        let Some(file_status) = status.classify(&relative) else {
            return Err(RepoError::NothingToCommit(relative));
        };

        if file_status == FileStatus::New && !add_if_untracked {
            return Err(RepoError::Untracked(relative));
        }
        let mut staged = Vec::new();
        if add_if_untracked {
            staged = status
                .new
                .iter()
                .filter(|p| is_within(p, &relative))
                .map(String::as_str)
                .collect();
            if !staged.is_empty() {
                self.stage(&staged)?;
            }
        }

        let message = message.map_or_else(|| file_status.message(&relative), str::to_string);
        let result = self.commit_paths(&[relative.as_str()], &message);
        if result.is_err()
            && !staged.is_empty()
            && let Err(e) = self.unstage(&staged)
        {
            warning!("failed to unstage {} after failed commit: {}", relative, e);
        }
        result
    }

    /// whether a repo-relative path is in the index or in HEAD
    pub fn is_tracked(&self, relative: &str) -> Result<bool> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        if index.get_path(Path::new(relative), 0).is_some() {
            return Ok(true);
        }
        Ok(self
            .head_tree()?
            .is_some_and(|tree| tree.get_path(Path::new(relative)).is_ok()))
    }

    /// commit exactly the given repo-relative paths with the given message
    ///
    /// runs the git binary rather than git2 so commit hooks and signing
    /// behave as they do for the user
    pub fn commit_paths(&self, paths: &[&str], message: &str) -> Result<Oid> {
        let mut command = Command::new("git");
        command
            .arg("commit")
            .arg("--quiet")
            .arg("--only")
            .arg("--message")
            .arg(message)
            .arg(format!("--author={}", self.author))
            .arg("--")
            .args(paths)
            .current_dir(&self.root);

        // no configured identity means git cannot work out a committer either
        if self.author.source == AuthorSource::Environment {
            command
                .env("GIT_COMMITTER_NAME", &self.author.name)
                .env("GIT_COMMITTER_EMAIL", &self.author.email);
        }

        run_git(command, "commit")?;

        let oid = self.repo.head()?.peel_to_commit()?.id();
        debug!("committed {} as {}", paths.join(", "), oid);
        Ok(oid)
    }

    /// drop index entries below `relative` that were staged as new but are
    /// gone from disk and never reached HEAD, returning whether any were
    fn drop_orphaned(&self, status: &Status, relative: &str) -> Result<bool> {
        let head_tree = self.head_tree()?;
        let orphaned: Vec<&str> = status
            .deleted
            .iter()
            .filter(|p| is_within(p, relative) && status.staged.contains(*p))
            .filter(|p| {
                head_tree
                    .as_ref()
                    .is_none_or(|tree| tree.get_path(Path::new(p.as_str())).is_err())
            })
            .map(String::as_str)
            .collect();
        if orphaned.is_empty() {
            return Ok(false);
        }
        self.unstage(&orphaned)?;
        Ok(true)
    }

    /// tree of the HEAD commit, `None` before the first commit
    fn head_tree(&self) -> Result<Option<git2::Tree<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head.peel_to_tree()?)),
            Err(e) if e.code() == ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// remove paths from the index, leaving the working tree alone
    fn unstage(&self, paths: &[&str]) -> Result<()> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        for path in paths {
            debug!("unstaging {}", path);
            index.remove_path(Path::new(path))?;
        }
        index.write()?;
        Ok(())
    }

    /// add each untracked file path to the index
    fn stage(&self, paths: &[&str]) -> Result<()> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        for path in paths {
            debug!("staging {}", path);
            index.add_path(Path::new(path))?;
        }
        index.write()?;
        Ok(())
    }

    /// write the bundled `.gitignore` and make it the first commit
    fn create_gitignore(&self) -> Result<()> {
        let gitignore = self.root.join(GITIGNORE_FILE);
        if !gitignore.exists() {
            std::fs::write(&gitignore, GITIGNORE_TEMPLATE)?;
        }

        let mut index = self.repo.index()?;
        index.add_path(Path::new(GITIGNORE_FILE))?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let signature = Signature::now(&self.author.name, &self.author.email)?;
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let message = FileStatus::New.message(GITIGNORE_FILE);
        self.repo
            .commit(Some("HEAD"), &signature, &signature, &message, &tree, &parents)?;
        debug!("created {}", gitignore.display());
        Ok(())
    }
}

/// resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// canonicalize the nearest existing ancestor and re-append the rest
///
/// the final component is never resolved, so deleted files and symlinks
/// keep their own name
fn canonicalize_lenient(path: &Path) -> PathBuf {
    let normalized = normalize(path);
    let (Some(mut existing), Some(name)) = (normalized.parent(), normalized.file_name()) else {
        return normalized;
    };

    let mut rest = vec![name.to_os_string()];
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

/// quote a command for logging
fn describe(command: &Command) -> String {
    let args: Vec<String> = std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    shlex::try_join(args.iter().map(String::as_str)).unwrap_or_else(|_| args.join(" "))
}

/// run a git command with a timeout, surfacing its output on failure
fn run_git(mut command: Command, name: &str) -> Result<()> {
    let failure = |message: String| RepoError::GitCommand {
        command: name.to_string(),
        message,
    };

    debug!("running {}", describe(&command));
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| failure(format!("failed to spawn git: {e}")))?;

    let timeout = Duration::from_secs(GIT_TIMEOUT_SECS);
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => {
            if status.success() {
                return Ok(());
            }

            let mut output = Vec::new();
            if let Some(mut stdout) = child.stdout.take() {
                let _ = stdout.read_to_end(&mut output);
            }
            if let Some(mut stderr) = child.stderr.take() {
                let _ = stderr.read_to_end(&mut output);
            }
            let output = String::from_utf8_lossy(&output).trim().to_string();
            if output.is_empty() {
                Err(failure(format!("exit status {status}")))
            } else {
                Err(failure(output))
            }
        }
        Ok(None) => {
            if let Err(e) = child.kill() {
                warning!("failed to kill git process: {}", e);
            }
            let _ = child.wait();
            Err(failure(format!("timed out after {GIT_TIMEOUT_SECS}s")))
        }
        Err(e) => Err(failure(format!("failed to wait for git: {e}"))),
    }
}
