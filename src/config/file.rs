//! TOML configuration file

use crate::types::CopyError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Option defaults read from a TOML file; unset keys keep built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub clobber: Option<bool>,
    pub dereference: Option<bool>,
    pub modified: Option<bool>,
    pub stop_on_error: Option<bool>,
    pub preserve_timestamps: Option<bool>,
    pub limit: Option<usize>,
    /// Regular expression; see `RegexFilter`
    pub filter: Option<String>,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub errors_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, CopyError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CopyError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&contents).map_err(|e| match e {
            CopyError::Config(msg) => CopyError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, CopyError> {
        toml::from_str(contents).map_err(|e| CopyError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        assert_eq!(FileConfig::parse("").expect("parse"), FileConfig::default());
    }

    #[test]
    fn test_parse_all_keys() {
        let config = FileConfig::parse(
            r#"
clobber = false
dereference = true
modified = true
stop_on_error = true
preserve_timestamps = true
limit = 32
filter = "[^a]$"
exclude = ["*.log", "target"]
include = ["keep.log"]
errors_file = "/tmp/treecp-errors.log"
"#,
        )
        .expect("parse");

        assert_eq!(config.clobber, Some(false));
        assert_eq!(config.dereference, Some(true));
        assert_eq!(config.modified, Some(true));
        assert_eq!(config.stop_on_error, Some(true));
        assert_eq!(config.preserve_timestamps, Some(true));
        assert_eq!(config.limit, Some(32));
        assert_eq!(config.filter.as_deref(), Some("[^a]$"));
        assert_eq!(config.exclude, vec!["*.log", "target"]);
        assert_eq!(config.include, vec!["keep.log"]);
        assert_eq!(
            config.errors_file,
            Some(PathBuf::from("/tmp/treecp-errors.log"))
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = FileConfig::parse("clober = true\n").expect_err("typo rejected");
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("clober"));
    }

    #[test]
    fn test_wrong_type_rejected() {
        assert!(FileConfig::parse("limit = \"many\"\n").is_err());
    }
}
