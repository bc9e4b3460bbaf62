use crate::hooks::{FileOperation, PostFileOpHook};
use crate::{debug, status};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// errors surfaced to whoever requested a file operation
#[derive(Debug, Error)]
pub enum ContentsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("file already exists: {0}")]
    AlreadyExists(String),

    #[error("path is outside the root directory: {0}")]
    Forbidden(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unexpected error while running post file op hook: {0}")]
    Hook(String),
}

impl ContentsError {
    /// http status a server front end would answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::AlreadyExists(_) => 409,
            Self::Forbidden(_) => 403,
            Self::Io { .. } | Self::Hook(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ContentsError>;

/// model returned after a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: String,
    pub size: u64,
}

/// file operations rooted at a directory, followed by a post-operation hook
pub struct FileContentsManager {
    root_dir: PathBuf,
    post_file_op_hook: Option<Box<dyn PostFileOpHook>>,
}

impl FileContentsManager {
    pub fn new(root_dir: PathBuf, post_file_op_hook: Option<Box<dyn PostFileOpHook>>) -> Self {
        Self {
            root_dir,
            post_file_op_hook,
        }
    }

    /// write `content` to `path`, whose parent directory must exist
    pub fn save(&self, path: &str, content: &[u8]) -> Result<SavedFile> {
        debug!("save {}", path);
        let os_path = self.os_path(path)?;
        let parent_exists = os_path.parent().is_some_and(Path::is_dir);
        if !parent_exists || os_path.is_dir() {
            return Err(ContentsError::NotFound(path.to_string()));
        }

        fs::write(&os_path, content).map_err(|source| ContentsError::Io {
            path: path.to_string(),
            source,
        })?;

        self.run_post_file_op_hook(&FileOperation::Save {
            path: os_path.clone(),
        })?;

        Ok(SavedFile {
            path: api_path(path),
            size: content.len() as u64,
        })
    }

    /// move a file or directory; the target must not exist yet
    pub fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        debug!("rename {} → {}", old_path, new_path);
        let old_os_path = self.os_path(old_path)?;
        let new_os_path = self.os_path(new_path)?;
        if old_os_path.symlink_metadata().is_err() {
            return Err(ContentsError::NotFound(old_path.to_string()));
        }
        if new_os_path.symlink_metadata().is_ok() {
            return Err(ContentsError::AlreadyExists(new_path.to_string()));
        }

        fs::rename(&old_os_path, &new_os_path).map_err(|source| ContentsError::Io {
            path: old_path.to_string(),
            source,
        })?;

        self.run_post_file_op_hook(&FileOperation::Rename {
            old_path: old_os_path,
            path: new_os_path,
        })
    }

    /// delete a file or a whole directory tree
    pub fn delete_file(&self, path: &str) -> Result<()> {
        debug!("delete {}", path);
        let os_path = self.os_path(path)?;
        let metadata = os_path
            .symlink_metadata()
            .map_err(|_| ContentsError::NotFound(path.to_string()))?;

        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&os_path)
        } else {
            fs::remove_file(&os_path)
        };
        removed.map_err(|source| ContentsError::Io {
            path: path.to_string(),
            source,
        })?;

        self.run_post_file_op_hook(&FileOperation::Delete { path: os_path })
    }

    /// run the configured hook, turning its failure into a 500
    pub fn run_post_file_op_hook(&self, operation: &FileOperation) -> Result<()> {
        let Some(hook) = &self.post_file_op_hook else {
            return Ok(());
        };

        debug!("running {} for {}", hook.name(), operation);
        hook.run(operation).map_err(|e| {
            crate::error!("post file op hook failed: {:#}", e);
            ContentsError::Hook(format!("{e:#}"))
        })?;
        status!("{}", operation);
        Ok(())
    }

    /// map an api path (`/`-rooted, relative to the root dir) onto disk
    fn os_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut os_path = self.root_dir.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => os_path.push(part),
                Component::CurDir => {}
                _ => return Err(ContentsError::Forbidden(path.to_string())),
            }
        }
        if os_path == self.root_dir {
            return Err(ContentsError::Forbidden(path.to_string()));
        }
        Ok(os_path)
    }
}

/// api paths are reported without a leading slash
fn api_path(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests;
