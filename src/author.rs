use crate::constants::{FALLBACK_AUTHOR_NAME, FALLBACK_EMAIL_DOMAIN, HUB_USER_ENV, USER_ENV};
use git2::Repository;
use std::fmt;

/// where an author identity came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorSource {
    Config,
    Environment,
}

/// identity recorded on every auto-commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
    pub source: AuthorSource,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// resolve the author for a repository
///
/// git config (local, global and system levels) wins when it has both
/// `user.name` and `user.email`, otherwise the hub or login user is used
pub fn resolve(repo: &Repository) -> Author {
    let configured = repo.config().ok().and_then(|config| {
        let name = config.get_string("user.name").ok()?;
        let email = config.get_string("user.email").ok()?;
        Some((name, email))
    });

    match configured {
        Some((name, email)) if !name.trim().is_empty() && !email.trim().is_empty() => Author {
            name,
            email,
            source: AuthorSource::Config,
        },
        _ => from_env(|key| std::env::var(key).ok()),
    }
}

/// build the fallback author from an environment lookup
fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Author {
    let name = [HUB_USER_ENV, USER_ENV]
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_AUTHOR_NAME.to_string());
    let email = format!("{name}@{FALLBACK_EMAIL_DOMAIN}");

    Author {
        name,
        email,
        source: AuthorSource::Environment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_hub_user_preferred_over_login_user() {
        let author = from_env(lookup(&[("JUPYTERHUB_USER", "alice"), ("USER", "jovyan")]));
        assert_eq!(author.name, "alice");
        assert_eq!(author.email, "alice@e2x.git");
        assert_eq!(author.source, AuthorSource::Environment);
    }

    #[test]
    fn test_login_user_when_no_hub_user() {
        let author = from_env(lookup(&[("USER", "jovyan")]));
        assert_eq!(author.name, "jovyan");
        assert_eq!(author.email, "jovyan@e2x.git");
    }

    #[test]
    fn test_blank_values_are_skipped() {
        let author = from_env(lookup(&[("JUPYTERHUB_USER", "  "), ("USER", "bob")]));
        assert_eq!(author.name, "bob");
    }

    #[test]
    fn test_fallback_name_without_env() {
        let author = from_env(lookup(&[]));
        assert_eq!(author.name, "jupyter");
        assert_eq!(author.email, "jupyter@e2x.git");
    }

    #[test]
    fn test_config_author_wins() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();

        let author = resolve(&repo);
        assert_eq!(author.name, "Test User");
        assert_eq!(author.email, "test@example.com");
        assert_eq!(author.source, AuthorSource::Config);
        assert_eq!(author.to_string(), "Test User <test@example.com>");
    }
}
