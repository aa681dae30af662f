//! Simulated interpreter search path.
//!
//! Turns bare reference names (`pkg.module`, `./other_notebook`) into file
//! locations the way the interpreter would, without executing anything.
//!
//! ## Search order
//!
//! Most specific first:
//!
//! 1. Directories appended at runtime on this branch, most recent first
//! 2. The directory of the container performing the lookup
//! 3. The working directory recorded when the request started
//! 4. The initial seed (`PYTHONPATH` or configured entries)
//!
//! ## Branching
//!
//! The working directory and seed live behind an `Arc` and never change.
//! Runtime additions live in a small per-branch overlay, so cloning a
//! `PathLookup` is the branch operation: a child sees everything its parent
//! appended so far, and nothing a sibling appends.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::trace;

/// Extensions tried, in order, when a notebook reference has none.
const NOTEBOOK_EXTENSIONS: &[&str] = &["py", "sql", "scala", "r"];

/// Immutable part of the lookup, shared by every branch of one request.
#[derive(Debug)]
struct LookupBase {
    cwd: PathBuf,
    seed: Vec<PathBuf>,
    display_root: PathBuf,
}

/// Ordered search path state for one traversal branch.
#[derive(Debug, Clone)]
pub struct PathLookup {
    base: Arc<LookupBase>,
    appended: Vec<PathBuf>,
    current_dir: Option<PathBuf>,
}

impl PathLookup {
    /// Create a lookup rooted at `cwd` with an explicit seed.
    ///
    /// The display root defaults to `cwd`.
    #[must_use]
    pub fn new(cwd: &Path, seed: Vec<PathBuf>) -> Self {
        let cwd = canonical_or_normalized(cwd);
        let seed = seed.iter().map(|p| canonical_or_normalized(p)).collect();
        Self {
            base: Arc::new(LookupBase {
                display_root: cwd.clone(),
                cwd,
                seed,
            }),
            appended: Vec::new(),
            current_dir: None,
        }
    }

    /// Create a lookup seeded from the `PYTHONPATH` environment variable.
    #[must_use]
    pub fn from_env(cwd: &Path) -> Self {
        let seed = std::env::var_os("PYTHONPATH")
            .map(|value| {
                std::env::split_paths(&value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self::new(cwd, seed)
    }

    /// Replace the root used for relative display names.
    #[must_use]
    pub fn with_display_root(self, display_root: &Path) -> Self {
        let base = LookupBase {
            cwd: self.base.cwd.clone(),
            seed: self.base.seed.clone(),
            display_root: canonical_or_normalized(display_root),
        };
        Self {
            base: Arc::new(base),
            ..self
        }
    }

    /// Working directory recorded at the start of the request.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.base.cwd
    }

    /// Initial search path entries, searched last.
    #[must_use]
    pub fn seed(&self) -> &[PathBuf] {
        &self.base.seed
    }

    /// Boundary root for relative display names.
    #[must_use]
    pub fn display_root(&self) -> &Path {
        &self.base.display_root
    }

    /// Directories appended at runtime on this branch, in append order.
    #[must_use]
    pub fn appended(&self) -> &[PathBuf] {
        &self.appended
    }

    /// Directory of the container currently performing lookups.
    #[must_use]
    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Branch the lookup for visiting a container in `dir`.
    #[must_use]
    pub fn branch_into(&self, dir: &Path) -> Self {
        Self {
            base: Arc::clone(&self.base),
            appended: self.appended.clone(),
            current_dir: Some(dir.to_path_buf()),
        }
    }

    /// Record a runtime search-path addition for the rest of this branch.
    ///
    /// Returns `false` if the directory was already present.
    pub fn append_path(&mut self, dir: &Path) -> bool {
        let dir = canonical_or_normalized(dir);
        if self.appended.contains(&dir) {
            return false;
        }
        trace!(directory = %dir.display(), "Appending to search path");
        self.appended.push(dir);
        true
    }

    /// All candidate directories in search order.
    pub fn search_dirs(&self) -> impl Iterator<Item = &Path> {
        self.appended
            .iter()
            .rev()
            .map(PathBuf::as_path)
            .chain(self.current_dir.as_deref())
            .chain(std::iter::once(self.base.cwd.as_path()))
            .chain(self.base.seed.iter().map(PathBuf::as_path))
    }

    /// Every directory a display name may be made relative to.
    #[must_use]
    pub fn library_roots(&self) -> Vec<PathBuf> {
        let mut roots = vec![self.base.display_root.clone()];
        for dir in self.search_dirs() {
            if !roots.iter().any(|r| r == dir) {
                roots.push(dir.to_path_buf());
            }
        }
        roots
    }

    /// Resolve a path to an existing file.
    ///
    /// Absolute paths bypass the search entirely.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> Option<PathBuf> {
        if path.is_absolute() {
            return existing_file(path);
        }
        self.search_dirs()
            .find_map(|dir| existing_file(&dir.join(path)))
    }

    /// Resolve a dotted module name (`a.b.c`) to `a/b/c.py` or `a/b/c/__init__.py`.
    #[must_use]
    pub fn resolve_module(&self, name: &str) -> Option<PathBuf> {
        find_module(self.search_dirs(), name)
    }

    /// Resolve a notebook path, trying the current directory before the general order.
    ///
    /// A path without extension also matches the notebook file saved with one
    /// of the known notebook extensions.
    #[must_use]
    pub fn resolve_notebook(&self, path: &str) -> Option<PathBuf> {
        let path = Path::new(path);
        let candidates = notebook_candidates(path);
        if path.is_absolute() {
            return candidates.iter().find_map(|c| existing_file(c));
        }
        self.current_dir
            .as_deref()
            .into_iter()
            .chain(self.search_dirs())
            .find_map(|dir| candidates.iter().find_map(|c| existing_file(&dir.join(c))))
    }
}

/// Relative file candidates for a dotted module name.
///
/// Returns `None` for names that cannot be a module path (empty segments).
fn module_candidates(name: &str) -> Option<[PathBuf; 2]> {
    let mut relative = PathBuf::new();
    for segment in name.split('.') {
        if segment.is_empty() {
            return None;
        }
        relative.push(segment);
    }
    Some([relative.with_extension("py"), relative.join("__init__.py")])
}

/// First `dir/a/b/c.py` or `dir/a/b/c/__init__.py` over `dirs`, in order.
pub(crate) fn find_module<'a>(
    dirs: impl IntoIterator<Item = &'a Path>,
    name: &str,
) -> Option<PathBuf> {
    let candidates = module_candidates(name)?;
    dirs.into_iter()
        .find_map(|dir| candidates.iter().find_map(|c| existing_file(&dir.join(c))))
}

fn notebook_candidates(path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![path.to_path_buf()];
    if path.extension().is_none() {
        for ext in NOTEBOOK_EXTENSIONS {
            candidates.push(path.with_extension(ext));
        }
    }
    candidates
}

fn existing_file(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        path.canonicalize().ok()
    } else {
        None
    }
}

/// Canonicalize when the path exists, otherwise fold `.` and `..` lexically.
pub(crate) fn canonical_or_normalized(path: &Path) -> PathBuf {
    path.canonicalize()
        .unwrap_or_else(|_| normalize_lexically(path))
}

/// Fold `.` and `..` components without touching the file system.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
