//! CLI command implementations.

mod display;

pub mod cycles;
pub mod graph;
pub mod problems;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use depwalk::{DependencyGraph, DependencyResolver, ResolverConfig, find_config};
use tracing::debug;

/// How to load the root.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum RootKind {
    /// Local file; the notebook header decides how it is split
    #[default]
    Auto,
    /// Notebook source, rejected without a header
    Notebook,
}

/// Options shared by every command.
#[derive(Debug)]
pub struct Request<'a> {
    /// Root to resolve
    pub root: &'a Path,
    /// Explicit configuration file
    pub config: Option<&'a Path>,
    /// How to load the root
    pub kind: RootKind,
}

impl Request<'_> {
    /// Load configuration and build the root's graph.
    pub fn build(&self) -> Result<DependencyGraph, depwalk::Error> {
        let config_path: Option<PathBuf> = match self.config {
            Some(path) => Some(path.to_path_buf()),
            None => self.root.parent().and_then(find_config),
        };
        let config = match &config_path {
            Some(path) => {
                debug!(config = %path.display(), "Loading configuration");
                ResolverConfig::load(path)?
            }
            None => ResolverConfig::default(),
        };

        let resolver = DependencyResolver::from_config(&config)?;
        match self.kind {
            RootKind::Auto => resolver.build_dependency_graph(self.root),
            RootKind::Notebook => resolver.build_notebook_dependency_graph(self.root),
        }
    }
}
