//! # depwalk: Dependency Graphs for Python Files and Notebooks
//!
//! depwalk discovers every unit a Python file or Databricks notebook
//! transitively depends on, without executing anything. It follows import
//! statements, `%run` directives, `dbutils.notebook.run` calls with constant
//! targets, and the search-path changes code makes at runtime through
//! `sys.path.append` and `sys.path.insert`.
//!
//! ## Design Philosophy
//!
//! - **Static, best effort** - Nothing is executed; what cannot be computed is reported
//! - **Problems, not failures** - One missing import never hides the rest of the graph
//! - **Cycle safe** - Each unit is loaded once and expanded once
//! - **Pluggable chain** - Reference categories are handled by resolvers tried in order
//!
//! ## Quick Start
//!
//! ```no_run
//! use depwalk::{DependencyResolver, PathLookup, SitePackages, Whitelist};
//! use std::path::Path;
//!
//! let workspace = Path::new("/path/to/workspace");
//! let resolver = DependencyResolver::standard(
//!     Whitelist::default(),
//!     SitePackages::parse(&workspace.join(".venv/lib/python3.11/site-packages"))?,
//!     PathLookup::from_env(workspace),
//! );
//!
//! let graph = resolver.build_dependency_graph(&workspace.join("main.py"))?;
//! println!("{} units, {} problems", graph.len(), graph.problems().len());
//!
//! for cycle in graph.detect_cycles() {
//!     println!("cycle through {} units", cycle.paths.len());
//! }
//! # Ok::<(), depwalk::Error>(())
//! ```

mod config;
mod error;
mod graph;
mod languages;
mod loader;
pub mod notebook;
mod parallel;
mod path_lookup;
mod resolver;
pub mod resolvers;
mod site_packages;
mod types;
mod whitelist;

pub use config::{CONFIG_FILE_NAME, ResolverConfig, find_config};
pub use error::{Error, Problem, ProblemCode, Result};
pub use graph::{Cycle, DependencyChain, DependencyGraph, DependencyKind, Edge};
pub use languages::{Extraction, ExtractionContext, PythonParser};
pub use loader::{
    FileLoader, LoaderCache, NotebookLoader, PackageLoader, SourceLoader, loader_for, sniff_kind,
};
pub use path_lookup::PathLookup;
pub use resolver::DependencyResolver;
pub use site_packages::{SitePackage, SitePackages, distribution_name};
pub use types::{ContainerKind, Location, Reference, ReferenceKind, SourceContainer, Span};
pub use whitelist::Whitelist;
