//! Parallel resolution of independent roots.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    resolve_many                       │
//! ├──────────────────────────────────────────────────────┤
//! │  rayon::par_iter() over roots                         │
//! │    each root: own LoaderCache + own PathLookup branch │
//! │  results collected in input order                     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! Requests share only the resolver itself, which is immutable.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::resolver::DependencyResolver;

impl DependencyResolver {
    /// Build one graph per root on the rayon pool.
    ///
    /// Results are returned in input order; a root that cannot be loaded
    /// fails only its own entry.
    pub fn resolve_many<P>(&self, roots: &[P]) -> Vec<Result<DependencyGraph>>
    where
        P: AsRef<Path> + Sync,
    {
        debug!(roots = roots.len(), "Resolving roots in parallel");
        roots
            .par_iter()
            .map(|root| self.build_dependency_graph(root.as_ref()))
            .collect()
    }

    /// Like [`Self::resolve_many`], pairing each result with its root.
    pub fn resolve_many_paired<P>(&self, roots: &[P]) -> Vec<(PathBuf, Result<DependencyGraph>)>
    where
        P: AsRef<Path> + Sync,
    {
        roots
            .iter()
            .map(|root| root.as_ref().to_path_buf())
            .zip(self.resolve_many(roots))
            .collect()
    }
}
