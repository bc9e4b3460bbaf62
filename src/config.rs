use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, GIT_COMMIT_HOOK};
use crate::hooks::{self, PostFileOpHook};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// settings read from `config.json`, overridable from the command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// directory api paths are resolved against, current dir when unset
    pub root_dir: Option<PathBuf>,

    /// dotted name of the hook run after each file operation, `null` disables
    pub post_file_op_hook: Option<String>,

    /// initialise a repository next to a file that is not under version control
    pub create_repo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: None,
            post_file_op_hook: Some(GIT_COMMIT_HOOK.to_string()),
            create_repo: false,
        }
    }
}

impl Config {
    /// `<config dir>/e2x-git/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// load from `path`, or the default location when `None`
    ///
    /// a missing file yields the defaults, a malformed one is an error
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// reject hook names nothing is registered under
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.post_file_op_hook {
            hooks::hook_by_name(name, self.create_repo)?;
        }
        Ok(())
    }

    pub fn root_dir(&self) -> Result<PathBuf> {
        match &self.root_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("failed to read current directory"),
        }
    }

    pub fn hook(&self) -> Result<Option<Box<dyn PostFileOpHook>>> {
        self.post_file_op_hook
            .as_deref()
            .map(|name| hooks::hook_by_name(name, self.create_repo))
            .transpose()
    }
}
