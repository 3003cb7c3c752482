//! Database configuration
//!
//! Options can be built in code with the `with_*` methods or loaded from a
//! JSON file. Missing fields in the file fall back to the defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the transaction log inside a database directory
pub const LOG_FILE_NAME: &str = "tx.log";

/// Name used when none is configured
pub const DEFAULT_DB_NAME: &str = "defaultdb";

/// Where and how a database lives on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Directory holding one sub-directory per database
    pub root_path: PathBuf,
    /// Database name (sub-directory of `root_path`)
    pub name: String,
    /// Re-derive every hash from the records when opening
    pub corruption_checker: bool,
    /// fsync the log after every commit
    pub sync_on_commit: bool,
}

impl Default for Options {
    fn default() -> Self {
        let root_path = dirs::data_local_dir()
            .map(|d| d.join("immulog"))
            .unwrap_or_else(|| PathBuf::from("data"));
        Options {
            root_path,
            name: DEFAULT_DB_NAME.to_string(),
            corruption_checker: true,
            sync_on_commit: true,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root_path(mut self, root_path: impl Into<PathBuf>) -> Self {
        self.root_path = root_path.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_corruption_checker(mut self, enabled: bool) -> Self {
        self.corruption_checker = enabled;
        self
    }

    pub fn with_sync_on_commit(mut self, enabled: bool) -> Self {
        self.sync_on_commit = enabled;
        self
    }

    /// Load options from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let options: Options = serde_json::from_str(&content)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject names that would escape `root_path`
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("Database name is empty".into()));
        }
        if self.name.contains(|c| c == '/' || c == '\\') || self.name == "." || self.name == ".." {
            return Err(Error::Config(format!(
                "Invalid database name: {}",
                self.name
            )));
        }
        Ok(())
    }

    /// Directory of this database
    pub fn db_dir(&self) -> PathBuf {
        self.root_path.join(&self.name)
    }

    /// Path of the transaction log file
    pub fn log_path(&self) -> PathBuf {
        self.db_dir().join(LOG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_builder() {
        let options = Options::new()
            .with_root_path("/tmp/paris")
            .with_name("EdithPiaf")
            .with_corruption_checker(false)
            .with_sync_on_commit(false);

        assert_eq!(options.db_dir(), PathBuf::from("/tmp/paris/EdithPiaf"));
        assert_eq!(
            options.log_path(),
            PathBuf::from("/tmp/paris/EdithPiaf").join(LOG_FILE_NAME)
        );
        assert!(!options.corruption_checker);
        assert!(!options.sync_on_commit);
    }

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.name, DEFAULT_DB_NAME);
        assert!(options.corruption_checker);
        assert!(options.sync_on_commit);
    }

    #[test]
    fn test_from_json_file_with_partial_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("immulog.json");
        std::fs::write(&path, r#"{ "name": "ledger", "sync_on_commit": false }"#).unwrap();

        let options = Options::from_json_file(&path).unwrap();
        assert_eq!(options.name, "ledger");
        assert!(!options.sync_on_commit);
        assert!(options.corruption_checker);
    }

    #[test]
    fn test_invalid_names() {
        assert!(Options::new().with_name("").validate().is_err());
        assert!(Options::new().with_name("../etc").validate().is_err());
        assert!(Options::new().with_name("..").validate().is_err());
        assert!(Options::new().with_name("ok_name").validate().is_ok());
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempdir().unwrap();
        let err = Options::from_json_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
