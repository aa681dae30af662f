//! Installed-package catalog.
//!
//! Built once from a directory listing of installed-package metadata
//! (`*.dist-info` and `*.egg-info` directories inside `site-packages`). Each
//! entry records the top-level module names the package provides, so an
//! `import yaml` can be matched to the `PyYAML` distribution without ever
//! reading the package's code.
//!
//! Top-level names come from `top_level.txt` when present, otherwise from
//! the first path component of each `RECORD` entry, otherwise from the
//! normalized distribution name.
//!
//! Editable installs (`pip install -e`) carry a `direct_url.json` pointing
//! at a local source tree. Those packages are local code and are resolved
//! like local files.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;

const DIST_INFO_SUFFIX: &str = ".dist-info";
const EGG_INFO_SUFFIX: &str = ".egg-info";

/// One installed distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePackage {
    name: String,
    version: Option<String>,
    metadata_dir: PathBuf,
    top_levels: Vec<String>,
    editable_root: Option<PathBuf>,
}

impl SitePackage {
    /// Create a catalog entry directly (for catalogs built by an external inventory).
    #[must_use]
    pub fn new(name: impl Into<String>, metadata_dir: PathBuf, top_levels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            metadata_dir,
            top_levels,
            editable_root: None,
        }
    }

    /// Mark the package as an editable install of the given source tree.
    #[must_use]
    pub fn with_editable_root(mut self, root: PathBuf) -> Self {
        self.editable_root = Some(root);
        self
    }

    /// Distribution name as installed.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installed version, when the metadata directory names one.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Metadata directory the entry was read from.
    #[must_use]
    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    /// Top-level importable module names.
    #[must_use]
    pub fn top_levels(&self) -> &[String] {
        &self.top_levels
    }

    /// Local source tree of an editable install.
    #[must_use]
    pub fn editable_root(&self) -> Option<&Path> {
        self.editable_root.as_deref()
    }

    /// Directories an editable install's modules may live in (`root`, `root/src`).
    #[must_use]
    pub fn editable_search_dirs(&self) -> Vec<PathBuf> {
        self.editable_root
            .iter()
            .flat_map(|root| [root.clone(), root.join("src")])
            .collect()
    }
}

/// Catalog of installed packages, looked up by top-level module name.
#[derive(Debug, Clone, Default)]
pub struct SitePackages {
    packages: Vec<SitePackage>,
    by_top_level: HashMap<String, usize>,
}

impl SitePackages {
    /// Build a catalog from explicit entries. Earlier entries win on name clashes.
    #[must_use]
    pub fn from_packages(packages: Vec<SitePackage>) -> Self {
        let mut by_top_level = HashMap::new();
        for (index, package) in packages.iter().enumerate() {
            for top_level in &package.top_levels {
                by_top_level.entry(top_level.clone()).or_insert(index);
            }
        }
        Self {
            packages,
            by_top_level,
        }
    }

    /// Parse every metadata directory inside a `site-packages` directory.
    ///
    /// Entries that cannot be read are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory itself cannot be listed.
    pub fn parse(site_packages: &Path) -> Result<Self> {
        Self::parse_all(&[site_packages.to_path_buf()])
    }

    /// Parse several `site-packages` directories; earlier directories win.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if any directory cannot be listed.
    pub fn parse_all(dirs: &[PathBuf]) -> Result<Self> {
        let mut packages = Vec::new();
        for dir in dirs {
            let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
                .filter_map(|entry| match entry {
                    Ok(e) => Some(e.path()),
                    Err(e) => {
                        warn!(directory = %dir.display(), error = %e, "Failed to read entry, skipping");
                        None
                    }
                })
                .filter(|p| p.is_dir() && is_metadata_dir(p))
                .collect();
            // Directory listing order is platform dependent.
            entries.sort();
            for metadata_dir in entries {
                if let Some(package) = parse_metadata_dir(&metadata_dir) {
                    packages.push(package);
                }
            }
        }
        debug!(packages = packages.len(), "Parsed installed-package catalog");
        Ok(Self::from_packages(packages))
    }

    /// Package providing the given top-level module name.
    #[must_use]
    pub fn get(&self, top_level: &str) -> Option<&SitePackage> {
        self.by_top_level
            .get(top_level)
            .map(|&index| &self.packages[index])
    }

    /// Number of packages in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Iterate over all packages.
    pub fn iter(&self) -> impl Iterator<Item = &SitePackage> {
        self.packages.iter()
    }
}

/// Distribution name from a metadata directory name.
///
/// `PyYAML-6.0.1.dist-info` → `PyYAML`, `foo.egg-info` → `foo`.
#[must_use]
pub fn distribution_name(dir_name: &str) -> Option<String> {
    let stem = dir_name
        .strip_suffix(DIST_INFO_SUFFIX)
        .or_else(|| dir_name.strip_suffix(EGG_INFO_SUFFIX))?;
    let name = stem.split_once('-').map_or(stem, |(name, _)| name);
    (!name.is_empty()).then(|| name.to_string())
}

fn is_metadata_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(DIST_INFO_SUFFIX) || n.ends_with(EGG_INFO_SUFFIX))
}

fn parse_metadata_dir(metadata_dir: &Path) -> Option<SitePackage> {
    let dir_name = metadata_dir.file_name()?.to_str()?;
    let name = distribution_name(dir_name)?;
    let version = dir_name
        .strip_suffix(DIST_INFO_SUFFIX)
        .or_else(|| dir_name.strip_suffix(EGG_INFO_SUFFIX))
        .and_then(|stem| stem.split('-').nth(1))
        .map(str::to_string);

    let top_levels = read_top_level(metadata_dir)
        .or_else(|| read_record(metadata_dir))
        .unwrap_or_else(|| vec![normalize_name(&name)]);

    Some(SitePackage {
        name,
        version,
        metadata_dir: metadata_dir.to_path_buf(),
        top_levels,
        editable_root: read_editable_root(metadata_dir),
    })
}

fn read_top_level(metadata_dir: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(metadata_dir.join("top_level.txt")).ok()?;
    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    (!names.is_empty()).then_some(names)
}

fn read_record(metadata_dir: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(metadata_dir.join("RECORD")).ok()?;
    let mut names = BTreeSet::new();
    for line in content.lines() {
        let Some(path) = line.split(',').next() else {
            continue;
        };
        let Some(first) = path.split('/').next() else {
            continue;
        };
        if first.is_empty()
            || first == ".."
            || first == "__pycache__"
            || is_metadata_dir(Path::new(first))
        {
            continue;
        }
        if !path.contains('/') && !first.ends_with(".py") {
            continue;
        }
        names.insert(first.strip_suffix(".py").unwrap_or(first).to_string());
    }
    (!names.is_empty()).then(|| names.into_iter().collect())
}

#[derive(Debug, Deserialize)]
struct DirectUrl {
    url: String,
    #[serde(default)]
    dir_info: DirInfo,
}

#[derive(Debug, Default, Deserialize)]
struct DirInfo {
    #[serde(default)]
    editable: bool,
}

fn read_editable_root(metadata_dir: &Path) -> Option<PathBuf> {
    let path = metadata_dir.join("direct_url.json");
    let content = fs::read_to_string(&path).ok()?;
    let direct: DirectUrl = match serde_json::from_str(&content) {
        Ok(d) => d,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed direct_url.json, ignoring");
            return None;
        }
    };
    if !direct.dir_info.editable {
        return None;
    }
    let encoded = direct.url.strip_prefix("file://")?;
    let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
    Some(PathBuf::from(decoded.as_ref()))
}

fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['-', '.'], "_")
}
