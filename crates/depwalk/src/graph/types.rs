//! Types for dependency graph queries.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::types::{Location, ReferenceKind};

/// How one container came to depend on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Import statement or `importlib.import_module`
    Import,
    /// `%run` directive
    Run,
    /// `dbutils.notebook.run` call
    NotebookRun,
}

impl DependencyKind {
    /// Edge kind produced by a reference kind; path mutations produce none.
    #[must_use]
    pub fn from_reference(kind: &ReferenceKind) -> Option<Self> {
        match kind {
            ReferenceKind::Import { .. } => Some(Self::Import),
            ReferenceKind::RunDirective { .. } => Some(Self::Run),
            ReferenceKind::NotebookRun { .. } => Some(Self::NotebookRun),
            ReferenceKind::PathMutation { .. } => None,
        }
    }

    /// Short lowercase name for display.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Run => "run",
            Self::NotebookRun => "notebook_run",
        }
    }
}

/// A directed dependency between two containers, keyed by canonical path.
///
/// The kind and location are those of the first reference that produced
/// the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    /// Dependent container
    pub from: PathBuf,
    /// Dependency container
    pub to: PathBuf,
    /// Reference category
    pub kind: DependencyKind,
    /// Where the reference sits inside `from`
    pub location: Option<Location>,
}

/// A set of containers that depend on each other in a loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// Containers involved in the cycle, smallest path first
    pub paths: Vec<PathBuf>,
}

impl Cycle {
    /// Whether `path` is part of this cycle.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// A path through the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChain {
    paths: Vec<PathBuf>,
}

impl DependencyChain {
    /// Create a chain, returning `None` if it is empty.
    #[must_use]
    pub fn new(paths: Vec<PathBuf>) -> Option<Self> {
        (!paths.is_empty()).then_some(Self { paths })
    }

    /// Containers from the start to the end of the chain.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of edges in the chain.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.paths.len() - 1
    }
}
