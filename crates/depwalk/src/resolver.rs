//! Dependency graph construction.
//!
//! `DependencyResolver` drives the resolver chain over a tree of containers:
//!
//! ```text
//! root path ──load──▶ container ──references──▶ resolver chain
//!                         ▲                          │
//!                         └──── visit child ◀── Dependency
//! ```
//!
//! ## Visit
//!
//! 1. Skip the container if its canonical path was already visited
//! 2. Record it and copy its parse-time problems into the graph
//! 3. Walk its references in document order:
//!    - path mutations extend the current lookup in place
//!    - everything else goes through the chain; a dependency adds an edge
//!      and is visited with a branch of the current lookup
//!
//! A child inherits the search path as it stood at the reference that
//! reached it. Nothing a child appends flows back to its parent or siblings.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::config::ResolverConfig;
use crate::error::{Error, Problem, ProblemCode, Result};
use crate::graph::{DependencyGraph, DependencyKind};
use crate::loader::{LoaderCache, NotebookLoader, SourceLoader, loader_for};
use crate::path_lookup::{PathLookup, canonical_or_normalized};
use crate::resolvers::{
    Dependency, LocalFileResolver, NotebookResolver, ReferenceResolver, Resolution,
    ResolveContext, SitePackageResolver, WhitelistResolver,
};
use crate::site_packages::SitePackages;
use crate::types::{Reference, ReferenceKind, SourceContainer};
use crate::whitelist::Whitelist;

/// Builds dependency graphs from root containers.
///
/// Holds no per-request state, so one resolver can serve any number of
/// requests, concurrently included.
pub struct DependencyResolver {
    resolvers: Vec<Box<dyn ReferenceResolver>>,
    lookup: PathLookup,
}

impl std::fmt::Debug for DependencyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field(
                "resolvers",
                &self.resolvers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("lookup", &self.lookup)
            .finish()
    }
}

impl DependencyResolver {
    /// Create a resolver with an explicit chain, tried in the given order.
    #[must_use]
    pub fn new(resolvers: Vec<Box<dyn ReferenceResolver>>, lookup: PathLookup) -> Self {
        Self { resolvers, lookup }
    }

    /// Create a resolver with the standard chain: notebooks, allow-list,
    /// installed packages, local files.
    #[must_use]
    pub fn standard(whitelist: Whitelist, site_packages: SitePackages, lookup: PathLookup) -> Self {
        Self::new(
            vec![
                Box::new(NotebookResolver),
                Box::new(WhitelistResolver::new(whitelist)),
                Box::new(SitePackageResolver::new(site_packages)),
                Box::new(LocalFileResolver),
            ],
            lookup,
        )
    }

    /// Create a standard resolver from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the working directory cannot be determined or a
    /// configured `site-packages` directory cannot be listed.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let cwd = match &config.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        let mut seed = config.search_path.clone();
        if config.inherit_pythonpath {
            seed.extend(PathLookup::from_env(&cwd).seed().iter().cloned());
        }
        let mut lookup = PathLookup::new(&cwd, seed);
        if let Some(display_root) = &config.display_root {
            lookup = lookup.with_display_root(display_root);
        }

        let whitelist = if config.default_whitelist {
            Whitelist::default()
        } else {
            Whitelist::empty()
        }
        .with_names(config.whitelist.iter().cloned());

        let site_packages = SitePackages::parse_all(&config.site_packages)?;

        debug!(
            cwd = %lookup.cwd().display(),
            whitelist = whitelist.len(),
            packages = site_packages.len(),
            "Created resolver from configuration"
        );
        Ok(Self::standard(whitelist, site_packages, lookup))
    }

    /// Initial search path state every request starts from.
    #[must_use]
    pub fn lookup(&self) -> &PathLookup {
        &self.lookup
    }

    /// Build the graph of a root whose kind is detected from its header.
    ///
    /// # Errors
    ///
    /// Returns `Error::RootUnavailable` if the root cannot be loaded and
    /// `Error::Parser` if the Python grammar fails to load.
    pub fn build_dependency_graph(&self, path: &Path) -> Result<DependencyGraph> {
        self.build(path, loader_for(path))
    }

    /// Build the graph of a local source file.
    ///
    /// The file is loaded the way an import of it would be: a file carrying
    /// a notebook header is split into cells, so its `%run` directives are
    /// followed.
    ///
    /// # Errors
    ///
    /// See [`Self::build_dependency_graph`].
    pub fn build_local_file_dependency_graph(&self, path: &Path) -> Result<DependencyGraph> {
        self.build(path, loader_for(path))
    }

    /// Build the graph of a notebook.
    ///
    /// # Errors
    ///
    /// See [`Self::build_dependency_graph`]. A root without a notebook header
    /// is unavailable.
    pub fn build_notebook_dependency_graph(&self, path: &Path) -> Result<DependencyGraph> {
        self.build(path, &NotebookLoader)
    }

    fn build(&self, path: &Path, loader: &dyn SourceLoader) -> Result<DependencyGraph> {
        info!(root = %path.display(), kind = loader.kind().as_str(), "Building dependency graph");

        let mut cache = LoaderCache::new()?;
        let root = loader
            .load(path, &mut cache)
            .map_err(|problem| Error::RootUnavailable {
                path: path.to_path_buf(),
                problem: Box::new(problem),
            })?;

        let lookup = self
            .lookup
            .branch_into(root.parent_dir().unwrap_or_else(|| self.lookup.cwd()));
        let graph = DependencyGraph::new(&root, lookup.display_root(), lookup.library_roots());

        let mut traversal = Traversal {
            resolvers: &self.resolvers,
            cache,
            graph,
            visited: HashSet::new(),
        };
        traversal.visit(root, lookup);

        let graph = traversal.graph;
        info!(
            root = %graph.root().display(),
            containers = graph.len(),
            edges = graph.edges().len(),
            problems = graph.problems().len(),
            "Built dependency graph"
        );
        Ok(graph)
    }
}

/// State of one request.
struct Traversal<'r> {
    resolvers: &'r [Box<dyn ReferenceResolver>],
    cache: LoaderCache,
    graph: DependencyGraph,
    visited: HashSet<PathBuf>,
}

impl Traversal<'_> {
    fn visit(&mut self, container: Arc<SourceContainer>, mut lookup: PathLookup) {
        if !self.visited.insert(container.path().to_path_buf()) {
            trace!(path = %container.path().display(), "Already visited");
            return;
        }
        debug!(
            path = %container.path().display(),
            kind = container.kind().as_str(),
            references = container.references().len(),
            "Visiting container"
        );

        self.graph.add_container(&container);
        for problem in container.problems() {
            self.graph.add_problem(problem.clone());
        }

        for reference in container.references() {
            if let ReferenceKind::PathMutation { directory } = &reference.kind {
                if lookup.append_path(directory) {
                    self.graph
                        .add_library_root(&canonical_or_normalized(directory));
                }
                continue;
            }

            match self.resolve(reference, &container, &lookup) {
                Resolution::Resolved(Dependency::Whitelisted(name)) => {
                    self.graph.add_whitelisted(name);
                }
                Resolution::Resolved(Dependency::Container(child)) => {
                    let Some(kind) = DependencyKind::from_reference(&reference.kind) else {
                        continue;
                    };
                    self.graph
                        .add_edge(container.path(), &child, kind, reference.location);
                    let child_lookup =
                        lookup.branch_into(child.parent_dir().unwrap_or_else(|| lookup.cwd()));
                    self.visit(child, child_lookup);
                }
                Resolution::Problem(problem) => {
                    debug!(
                        path = %problem.source_path.display(),
                        code = %problem.code,
                        message = %problem.message,
                        "Resolution problem"
                    );
                    self.graph.add_problem(problem);
                }
                Resolution::NotMine => {}
            }
        }
    }

    /// Offer a reference to each resolver in order; the first claim wins.
    fn resolve(
        &mut self,
        reference: &Reference,
        container: &SourceContainer,
        lookup: &PathLookup,
    ) -> Resolution {
        let mut ctx = ResolveContext {
            container,
            lookup,
            cache: &mut self.cache,
        };
        for resolver in self.resolvers {
            match resolver.resolve(reference, &mut ctx) {
                Resolution::NotMine => {}
                claimed => {
                    trace!(
                        resolver = resolver.name(),
                        reference = %reference.display_name(),
                        "Reference claimed"
                    );
                    return claimed;
                }
            }
        }
        Resolution::Problem(
            Problem::new(
                ProblemCode::UnresolvedReferenceKind,
                container.path(),
                format!("no resolver handles reference: {}", reference.display_name()),
            )
            .at(reference.location),
        )
    }
}
