//! Indexing configuration
//!
//! The core accepts only what the pipeline needs: the repository path, the
//! project name used as the root of every qualified name, and the ignore
//! patterns honoured by the structure walk. An optional `cartograph.toml`
//! at the repository root can extend the ignore set.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Configuration for a single indexing run
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Repository root to index
    pub repo_path: PathBuf,
    /// Project name; first component of every qualified name
    pub project_name: String,
    /// Directory names skipped during the walk
    pub ignore: BTreeSet<String>,
}

/// On-disk overlay (`cartograph.toml` in the repository root)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigOverlay {
    ignore: IgnoreOverlay,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct IgnoreOverlay {
    patterns: Vec<String>,
}

impl IndexConfig {
    /// Build a configuration for `repo_path`, deriving the project name from
    /// the directory name when `project_name` is None.
    pub fn new(repo_path: impl AsRef<Path>, project_name: Option<String>) -> Result<Self> {
        let repo_path = repo_path.as_ref().to_path_buf();
        if !repo_path.is_dir() {
            return Err(Error::RepoNotFound { path: repo_path });
        }

        let project_name = match project_name {
            Some(name) => name,
            None => repo_path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .ok_or_else(|| Error::Config {
                    message: format!(
                        "cannot derive project name from path: {}",
                        repo_path.display()
                    ),
                })?,
        };

        let mut config = Self {
            repo_path,
            project_name,
            ignore: default_ignore_patterns(),
        };
        config.load_overlay()?;
        Ok(config)
    }

    /// Add extra ignore patterns (CLI `--ignore` repeats).
    pub fn with_ignores<I: IntoIterator<Item = String>>(mut self, patterns: I) -> Self {
        self.ignore.extend(patterns);
        self
    }

    /// Check whether any component of a repo-relative path is ignored.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        relative
            .components()
            .any(|c| matches!(c.as_os_str().to_str(), Some(part) if self.ignore.contains(part)))
    }

    fn load_overlay(&mut self) -> Result<()> {
        let overlay_path = self.repo_path.join("cartograph.toml");
        if !overlay_path.is_file() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(&overlay_path)?;
        let overlay: ConfigOverlay = toml::from_str(&raw)?;
        self.ignore.extend(overlay.ignore.patterns);
        Ok(())
    }
}

/// Directories never worth indexing
fn default_ignore_patterns() -> BTreeSet<String> {
    [
        ".git",
        ".hg",
        ".svn",
        "node_modules",
        "__pycache__",
        ".venv",
        "venv",
        "target",
        "dist",
        "build",
        ".idea",
        ".vscode",
        ".pytest_cache",
        ".mypy_cache",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derives_project_name_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("my_service");
        std::fs::create_dir(&repo).unwrap();

        let config = IndexConfig::new(&repo, None).unwrap();
        assert_eq!(config.project_name, "my_service");
    }

    #[test]
    fn test_overlay_extends_ignore_set() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cartograph.toml"),
            "[ignore]\npatterns = [\"generated\"]\n",
        )
        .unwrap();

        let config = IndexConfig::new(dir.path(), Some("proj".into())).unwrap();
        assert!(config.ignore.contains("generated"));
        assert!(config.ignore.contains("node_modules"));
        assert!(config.is_ignored(Path::new("generated/deep/file.py")));
        assert!(!config.is_ignored(Path::new("src/file.py")));
    }

    #[test]
    fn test_missing_repo_is_an_error() {
        let result = IndexConfig::new("/nonexistent/path/xyz", Some("p".into()));
        assert!(matches!(result, Err(Error::RepoNotFound { .. })));
    }
}
