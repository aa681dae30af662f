//! Resolver configuration.
//!
//! Configuration is an optional YAML file, `.depwalk.yaml`, discovered by
//! walking up from the analyzed root:
//!
//! ```yaml
//! working-dir: .
//! display-root: .
//! search-path:
//!   - libs
//! inherit-pythonpath: true
//! site-packages:
//!   - .venv/lib/python3.11/site-packages
//! whitelist:
//!   - databricks.sdk
//! default-whitelist: true
//! ```
//!
//! Relative paths are interpreted against the directory holding the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the configuration file.
pub const CONFIG_FILE_NAME: &str = ".depwalk.yaml";

/// Maximum directory depth to traverse when searching for a configuration file
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// Settings for building a `DependencyResolver`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolverConfig {
    /// Working directory recorded at request start (defaults to the process cwd)
    pub working_dir: Option<PathBuf>,
    /// Root for relative display names (defaults to the working directory)
    pub display_root: Option<PathBuf>,
    /// Extra search-path seed entries, searched after the working directory
    pub search_path: Vec<PathBuf>,
    /// Append `PYTHONPATH` entries to the seed
    pub inherit_pythonpath: bool,
    /// `site-packages` directories to build the installed-package catalog from
    pub site_packages: Vec<PathBuf>,
    /// Module names to allow-list in addition to the defaults
    pub whitelist: Vec<String>,
    /// Start from the standard-library allow-list
    pub default_whitelist: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            working_dir: None,
            display_root: None,
            search_path: Vec::new(),
            inherit_pythonpath: true,
            site_packages: Vec::new(),
            whitelist: Vec::new(),
            default_whitelist: true,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from a file, rebasing relative paths onto its directory.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read and `Error::Config` if
    /// it is not valid configuration YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(&content)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.rebased(base))
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if serialization fails and `Error::Io` if the
    /// file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Resolve every relative path against `base`.
    #[must_use]
    pub fn rebased(mut self, base: &Path) -> Self {
        let rebase = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.working_dir = self.working_dir.map(rebase);
        self.display_root = self.display_root.map(rebase);
        self.search_path = self.search_path.into_iter().map(rebase).collect();
        self.site_packages = self.site_packages.into_iter().map(rebase).collect();
        self
    }
}

/// Find a configuration file by searching up the directory tree.
///
/// Returns `None` if none is found within the depth limit.
#[must_use]
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}
