//! Content loaders.
//!
//! One loader per container kind turns a location into a `SourceContainer`:
//!
//! - **`FileLoader`**: plain Python source
//! - **`NotebookLoader`**: notebook source split into segments
//! - **`PackageLoader`**: opaque installed-package stub from its metadata directory
//!
//! Loaders are stateless; everything that must live for one request (loaded
//! containers, the tree-sitter parser) sits in an explicit `LoaderCache` the
//! caller passes to every `load`. Independent requests therefore never share
//! state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Problem, ProblemCode, Result};
use crate::languages::{ExtractionContext, PythonParser};
use crate::notebook::{self, CellLanguage, NotebookLanguage};
use crate::site_packages::distribution_name;
use crate::types::{ContainerKind, SourceContainer};

/// Per-request cache of loaded containers, keyed by canonical path.
#[derive(Debug)]
pub struct LoaderCache {
    containers: HashMap<PathBuf, Arc<SourceContainer>>,
    parser: PythonParser,
}

impl LoaderCache {
    /// Create an empty cache with a fresh Python parser.
    pub fn new() -> Result<Self> {
        Ok(Self {
            containers: HashMap::new(),
            parser: PythonParser::new()?,
        })
    }

    /// Previously loaded container for a canonical path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<SourceContainer>> {
        self.containers.get(path).cloned()
    }

    /// Number of containers loaded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Whether nothing has been loaded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    fn insert(&mut self, container: SourceContainer) -> Arc<SourceContainer> {
        let container = Arc::new(container);
        self.containers
            .insert(container.path().to_path_buf(), Arc::clone(&container));
        container
    }
}

/// Loads one kind of container.
pub trait SourceLoader: Send + Sync {
    /// Kind of container this loader produces.
    fn kind(&self) -> ContainerKind;

    /// Load `path`, returning the cached instance if it was loaded before.
    ///
    /// # Errors
    ///
    /// Returns a `Problem` if the location is missing, unreadable, or does
    /// not have the shape this loader expects.
    fn load(
        &self,
        path: &Path,
        cache: &mut LoaderCache,
    ) -> std::result::Result<Arc<SourceContainer>, Problem>;
}

/// Loader for plain Python files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl SourceLoader for FileLoader {
    fn kind(&self) -> ContainerKind {
        ContainerKind::File
    }

    fn load(
        &self,
        path: &Path,
        cache: &mut LoaderCache,
    ) -> std::result::Result<Arc<SourceContainer>, Problem> {
        let canonical = canonicalize(path)?;
        if let Some(hit) = cache.get(&canonical) {
            trace!(path = %canonical.display(), "Loader cache hit");
            return Ok(hit);
        }

        let content = read_source(&canonical)?;
        let ctx = ExtractionContext {
            path: &canonical,
            segment: None,
            line_offset: 0,
        };
        let extraction = cache.parser.extract(&content, &ctx);
        debug!(
            path = %canonical.display(),
            references = extraction.references.len(),
            problems = extraction.problems.len(),
            "Loaded file"
        );
        Ok(cache.insert(SourceContainer::file(
            canonical,
            extraction.references,
            extraction.problems,
        )))
    }
}

/// Loader for notebook sources.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotebookLoader;

impl SourceLoader for NotebookLoader {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Notebook
    }

    fn load(
        &self,
        path: &Path,
        cache: &mut LoaderCache,
    ) -> std::result::Result<Arc<SourceContainer>, Problem> {
        let canonical = canonicalize(path)?;
        if let Some(hit) = cache.get(&canonical) {
            trace!(path = %canonical.display(), "Loader cache hit");
            // A plain file cached by an import is still not a notebook
            if hit.kind() != ContainerKind::Notebook {
                return Err(not_a_notebook(canonical));
            }
            return Ok(hit);
        }

        let content = read_source(&canonical)?;
        if !notebook::is_notebook(&canonical, &content) {
            return Err(not_a_notebook(canonical));
        }

        let language = NotebookLanguage::from_path(&canonical);
        let segments = notebook::split_segments(&content, language);
        let mut references = Vec::new();
        let mut problems = Vec::new();

        for segment in &segments {
            match segment.language {
                CellLanguage::Python => {
                    let ctx = ExtractionContext {
                        path: &canonical,
                        segment: Some(segment.index),
                        line_offset: segment.line_offset(),
                    };
                    let extraction = cache.parser.extract(&segment.source, &ctx);
                    references.extend(extraction.references);
                    problems.extend(extraction.problems);
                }
                CellLanguage::Run => {
                    let (refs, errs) = notebook::run_directives(segment, &canonical);
                    references.extend(refs);
                    problems.extend(errs);
                }
                CellLanguage::Pip => {
                    debug!(
                        path = %canonical.display(),
                        segment = segment.index,
                        "Skipping %pip cell, package installs are not resolved"
                    );
                }
                _ => {}
            }
        }

        debug!(
            path = %canonical.display(),
            segments = segments.len(),
            references = references.len(),
            problems = problems.len(),
            "Loaded notebook"
        );
        Ok(cache.insert(SourceContainer::notebook(
            canonical, segments, references, problems,
        )))
    }
}

/// Loader for installed-package stubs.
///
/// The path is the package's metadata directory (`name-1.0.dist-info`);
/// nothing inside the package is read.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageLoader;

impl SourceLoader for PackageLoader {
    fn kind(&self) -> ContainerKind {
        ContainerKind::InstalledPackage
    }

    fn load(
        &self,
        path: &Path,
        cache: &mut LoaderCache,
    ) -> std::result::Result<Arc<SourceContainer>, Problem> {
        let canonical = canonicalize(path)?;
        if let Some(hit) = cache.get(&canonical) {
            return Ok(hit);
        }
        let name = canonical
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(distribution_name)
            .ok_or_else(|| {
                Problem::new(
                    ProblemCode::ParseError,
                    canonical.clone(),
                    format!("not a package metadata directory: {}", canonical.display()),
                )
            })?;
        Ok(cache.insert(SourceContainer::installed_package(canonical, name)))
    }
}

/// Guess the container kind of a local file from its header.
///
/// Unreadable files are reported as `File`; the loader reports the failure.
#[must_use]
pub fn sniff_kind(path: &Path) -> ContainerKind {
    match std::fs::read_to_string(path) {
        Ok(content) if notebook::is_notebook(path, &content) => ContainerKind::Notebook,
        _ => ContainerKind::File,
    }
}

/// Loader for a local source file, chosen by its header.
#[must_use]
pub fn loader_for(path: &Path) -> &'static dyn SourceLoader {
    match sniff_kind(path) {
        ContainerKind::Notebook => &NotebookLoader,
        _ => &FileLoader,
    }
}

fn not_a_notebook(path: PathBuf) -> Problem {
    let message = format!(
        "not a notebook, expected header '{}': {}",
        notebook::NOTEBOOK_HEADER,
        path.display()
    );
    Problem::new(ProblemCode::ParseError, path, message)
}

fn canonicalize(path: &Path) -> std::result::Result<PathBuf, Problem> {
    path.canonicalize()
        .map_err(|e| Problem::io_error(path.to_path_buf(), &e))
}

fn read_source(path: &Path) -> std::result::Result<String, Problem> {
    let bytes = std::fs::read(path).map_err(|e| Problem::io_error(path.to_path_buf(), &e))?;
    String::from_utf8(bytes).map_err(|_| Problem::encoding_error(path.to_path_buf()))
}
