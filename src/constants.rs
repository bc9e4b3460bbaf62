// author
pub const FALLBACK_EMAIL_DOMAIN: &str = "e2x.git";
pub const FALLBACK_AUTHOR_NAME: &str = "jupyter";
pub const HUB_USER_ENV: &str = "JUPYTERHUB_USER";
pub const USER_ENV: &str = "USER";

// git
pub const GIT_TIMEOUT_SECS: u64 = 30;
pub const GITIGNORE_FILE: &str = ".gitignore";
pub const GITIGNORE_TEMPLATE: &str = include_str!("../assets/gitignore");

// config
pub const CONFIG_DIR_NAME: &str = "e2x-git";
pub const CONFIG_FILE_NAME: &str = "config.json";

// hooks
pub const GIT_COMMIT_HOOK: &str = "e2x_git.hooks.git_commit_hook";
pub const POST_SAVE_COMMIT_HOOK: &str = "e2x_git.hooks.post_save_commit_hook";
