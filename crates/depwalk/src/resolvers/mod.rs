//! Reference resolver chain.
//!
//! Each resolver handles one category of reference. The orchestrator offers
//! every reference to the resolvers in a fixed priority order and the first
//! one that claims it decides the outcome:
//!
//! 1. `NotebookResolver`: `%run` directives and `dbutils.notebook.run` calls
//! 2. `WhitelistResolver`: standard-library and runtime modules
//! 3. `SitePackageResolver`: modules provided by installed packages
//! 4. `LocalFileResolver`: everything else, searched on the path lookup
//!
//! A resolver that recognizes a reference but cannot satisfy it returns a
//! `Problem` instead of declining, so later resolvers never see it.

mod local_file;
mod notebook;
mod site_packages;
mod whitelist;

pub use local_file::LocalFileResolver;
pub use notebook::NotebookResolver;
pub use site_packages::SitePackageResolver;
pub use whitelist::WhitelistResolver;

use std::path::Path;
use std::sync::Arc;

use crate::error::Problem;
use crate::loader::{LoaderCache, SourceLoader};
use crate::path_lookup::PathLookup;
use crate::types::{Reference, SourceContainer};

/// A successfully resolved reference.
#[derive(Debug, Clone)]
pub enum Dependency {
    /// A loaded unit the orchestrator visits next
    Container(Arc<SourceContainer>),
    /// Allow-listed module, recorded by the matched entry and never loaded
    Whitelisted(String),
}

impl Dependency {
    /// The loaded container, if this dependency has one.
    #[must_use]
    pub fn container(&self) -> Option<&Arc<SourceContainer>> {
        match self {
            Self::Container(c) => Some(c),
            Self::Whitelisted(_) => None,
        }
    }
}

/// Outcome of offering one reference to one resolver.
#[derive(Debug)]
pub enum Resolution {
    /// The resolver does not handle this kind of reference
    NotMine,
    /// The reference was resolved
    Resolved(Dependency),
    /// The resolver claimed the reference but could not satisfy it
    Problem(Problem),
}

/// Everything a resolver may consult for one reference.
#[derive(Debug)]
pub struct ResolveContext<'a> {
    /// Container the reference was found in
    pub container: &'a SourceContainer,
    /// Search path state of the current branch
    pub lookup: &'a PathLookup,
    /// Per-request loader cache
    pub cache: &'a mut LoaderCache,
}

impl ResolveContext<'_> {
    /// Load `path` with `loader`, re-attributing a failure to the referencing site.
    pub(crate) fn load(
        &mut self,
        loader: &dyn SourceLoader,
        path: &Path,
        reference: &Reference,
    ) -> Resolution {
        match loader.load(path, self.cache) {
            Ok(container) => Resolution::Resolved(Dependency::Container(container)),
            Err(problem) => Resolution::Problem(
                Problem::new(
                    problem.code,
                    self.container.path(),
                    format!("{}: {}", reference.display_name(), problem.message),
                )
                .at(reference.location),
            ),
        }
    }
}

/// One strategy in the resolver chain.
pub trait ReferenceResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Try to resolve `reference`.
    fn resolve(&self, reference: &Reference, ctx: &mut ResolveContext<'_>) -> Resolution;
}
