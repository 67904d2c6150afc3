use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tankobon_config::{Config, RootConfig};
use tankobon_extract::NamingPattern;
use tankobon_storage::{is_sub_path, to_slash};

/// A library folder together with the naming pattern of its sub-folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub path: PathBuf,
    pub pattern: NamingPattern,
}

impl Root {
    pub fn new(path: impl Into<PathBuf>, pattern: NamingPattern) -> Self {
        Self { path: path.into(), pattern }
    }

    /// Whether `path` is this root or lies beneath it.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        is_sub_path(&self.path, path)
    }

    /// `path` relative to the root, `/`-separated. `None` when the path is
    /// outside the root; empty for the root itself.
    pub fn relative(&self, path: impl AsRef<Path>) -> Option<String> {
        path.as_ref().strip_prefix(&self.path).ok().map(to_slash)
    }
}

impl TryFrom<&RootConfig> for Root {
    type Error = crate::error::Error;

    fn try_from(config: &RootConfig) -> Result<Self> {
        let pattern = config.naming_pattern().or_raise(|| ErrorKind::Config)?;
        Ok(Self::new(&config.path, pattern))
    }
}

/// Every root in `config`, with its naming pattern compiled.
pub fn roots_from_config(config: &Config) -> Result<Vec<Root>> {
    config.roots.iter().map(Root::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Root {
        Root::new("/lib", "{artist}/{series}/{issue}".parse().unwrap())
    }

    #[test]
    fn test_relative() {
        assert_eq!(root().relative("/lib/Jane/MySeries/Issue1").as_deref(), Some("Jane/MySeries/Issue1"));
        assert_eq!(root().relative("/lib").as_deref(), Some(""));
        assert_eq!(root().relative("/library/Jane"), None);
    }

    #[test]
    fn test_contains_is_component_wise() {
        assert!(root().contains("/lib/a"));
        assert!(!root().contains("/libx/a"));
    }

    #[test]
    fn test_from_config() {
        let parsed = Root::try_from(&RootConfig::new("/lib", "{series}/{issue}")).unwrap();
        assert_eq!(parsed.pattern.placeholders().collect::<Vec<_>>(), vec!["series", "issue"]);
        assert!(Root::try_from(&RootConfig::new("/lib", "{}")).is_err());
    }

    #[test]
    fn test_roots_from_config() {
        let config = Config {
            roots: vec![RootConfig::new("/a", "{issue}"), RootConfig::new("/b", "{artist}/{issue}")],
            ..Config::default()
        };
        let roots = roots_from_config(&config).unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[1].path, PathBuf::from("/b"));
        assert!(roots_from_config(&Config::default()).unwrap().is_empty());
    }
}
