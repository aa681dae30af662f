//! Domain types for dependency resolution.
//!
//! These types represent the core domain model:
//! - **Units**: `SourceContainer` (one loaded file, notebook, or package stub)
//! - **Raw mentions**: `Reference` and `ReferenceKind` (unresolved, in document order)
//! - **Positions**: `Span` and `Location` (1-indexed, notebook-segment aware)
//!
//! ## Design Decisions
//!
//! | Decision | Choice | Rationale |
//! |----------|--------|-----------|
//! | Identity | Canonical path | Symlinks and `..` must not create duplicate nodes |
//! | Mutation targets | Absolute at extraction | The container directory is only known while loading |
//! | Segment | Optional on `Location` | Plain files have no cells |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Problem;
use crate::notebook::Segment;

// ============================================================================
// Enums
// ============================================================================

/// What kind of unit a container represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// Plain Python source file
    File,
    /// Multi-cell notebook document
    Notebook,
    /// Opaque installed package, never expanded
    InstalledPackage,
}

impl ContainerKind {
    /// Short lowercase name for display.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Notebook => "notebook",
            Self::InstalledPackage => "installed_package",
        }
    }
}

/// The category of a raw reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `import a.b` / `from a.b import c` / `importlib.import_module("a.b")`
    Import {
        /// Dotted module name without leading dots (may be empty for `from . import x`)
        name: String,
        /// Number of leading dots of a relative import, 0 for absolute
        level: u32,
    },
    /// `%run ./other` notebook directive
    RunDirective {
        /// Path exactly as written after `%run`
        path: String,
    },
    /// `dbutils.notebook.run("./other", ...)` with a constant target
    NotebookRun {
        /// Path exactly as written in the string literal
        path: String,
    },
    /// `sys.path.append(...)` / `sys.path.insert(...)`
    PathMutation {
        /// Absolute directory that was added to the search path
        directory: PathBuf,
    },
}

// ============================================================================
// Positions
// ============================================================================

/// A source/end position span in a file.
///
/// Positions are 1-indexed (first line is 1, first column is 1) to match
/// editor conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Starting line (1-indexed)
    pub start_line: u32,
    /// Starting column (1-indexed)
    pub start_column: u32,
    /// Ending line (1-indexed, inclusive)
    pub end_line: u32,
    /// Ending column (1-indexed, exclusive)
    pub end_column: u32,
}

impl Span {
    /// Create a new span with validation.
    ///
    /// Returns `None` if the end position is before the start position.
    #[must_use]
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Option<Self> {
        if end_line < start_line || (end_line == start_line && end_column < start_column) {
            return None;
        }
        Some(Self {
            start_line,
            start_column,
            end_line,
            end_column,
        })
    }

    /// Span covering a whole single line of `width` characters.
    #[must_use]
    pub fn line(line: u32, width: u32) -> Self {
        Self {
            start_line: line,
            start_column: 1,
            end_line: line,
            end_column: width + 1,
        }
    }

    /// Shift the span down by `lines`, used when a segment is parsed on its own.
    #[must_use]
    pub fn offset_lines(self, lines: u32) -> Self {
        Self {
            start_line: self.start_line + lines,
            end_line: self.end_line + lines,
            ..self
        }
    }
}

/// Where a reference or problem sits inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Index of the notebook segment (cell), `None` for plain files
    pub segment: Option<usize>,
    /// File-absolute span
    pub span: Span,
}

impl Location {
    /// Create a location.
    #[must_use]
    pub fn new(segment: Option<usize>, span: Span) -> Self {
        Self { segment, span }
    }
}

// ============================================================================
// References
// ============================================================================

/// A raw, unresolved dependency mention inside a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// What kind of mention this is
    pub kind: ReferenceKind,
    /// Position inside the container
    pub location: Option<Location>,
    /// Source text of the statement that produced the reference
    pub text: String,
}

impl Reference {
    /// Create a reference.
    #[must_use]
    pub fn new(kind: ReferenceKind, location: Option<Location>, text: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            text: text.into(),
        }
    }

    /// Human-readable name of what is referenced (`..pkg.mod`, `./other`).
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.kind {
            ReferenceKind::Import { name, level } => {
                format!("{}{name}", ".".repeat(*level as usize))
            }
            ReferenceKind::RunDirective { path } | ReferenceKind::NotebookRun { path } => {
                path.clone()
            }
            ReferenceKind::PathMutation { directory } => directory.display().to_string(),
        }
    }

    /// Whether this is an absolute (non-relative) import.
    #[must_use]
    pub fn absolute_import_name(&self) -> Option<&str> {
        match &self.kind {
            ReferenceKind::Import { name, level: 0 } if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}

// ============================================================================
// Containers
// ============================================================================

/// One resolvable unit: a file, a notebook, or an installed-package stub.
///
/// Containers are created by loaders and shared through `Arc`; two containers
/// are the same unit exactly when their canonical paths match.
#[derive(Debug, Clone)]
pub struct SourceContainer {
    path: PathBuf,
    kind: ContainerKind,
    references: Vec<Reference>,
    segments: Vec<Segment>,
    problems: Vec<Problem>,
    package: Option<String>,
}

impl SourceContainer {
    /// Container for a plain file.
    pub(crate) fn file(path: PathBuf, references: Vec<Reference>, problems: Vec<Problem>) -> Self {
        Self {
            path,
            kind: ContainerKind::File,
            references,
            segments: Vec::new(),
            problems,
            package: None,
        }
    }

    /// Container for a notebook split into segments.
    pub(crate) fn notebook(
        path: PathBuf,
        segments: Vec<Segment>,
        references: Vec<Reference>,
        problems: Vec<Problem>,
    ) -> Self {
        Self {
            path,
            kind: ContainerKind::Notebook,
            references,
            segments,
            problems,
            package: None,
        }
    }

    /// Opaque leaf for an installed package.
    pub(crate) fn installed_package(path: PathBuf, package: String) -> Self {
        Self {
            path,
            kind: ContainerKind::InstalledPackage,
            references: Vec::new(),
            segments: Vec::new(),
            problems: Vec::new(),
            package: Some(package),
        }
    }

    /// Canonical absolute path (the identity of the container).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kind of unit.
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Raw references in document order.
    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Notebook segments; empty for files and packages.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Problems found while parsing this container.
    #[must_use]
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Package name for installed-package stubs.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Directory the container lives in.
    #[must_use]
    pub fn parent_dir(&self) -> Option<&Path> {
        self.path.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_rejects_end_before_start() {
        assert!(Span::new(5, 1, 4, 1).is_none());
        assert!(Span::new(5, 10, 5, 9).is_none());
        assert!(Span::new(5, 10, 5, 10).is_some());
    }

    #[test]
    fn span_offset_moves_both_lines() {
        let span = Span::new(1, 4, 2, 8).unwrap().offset_lines(10);
        assert_eq!(span.start_line, 11);
        assert_eq!(span.end_line, 12);
        assert_eq!(span.start_column, 4);
    }

    #[test]
    fn display_name_includes_relative_dots() {
        let reference = Reference::new(
            ReferenceKind::Import {
                name: "pkg.mod".to_string(),
                level: 2,
            },
            None,
            "from ..pkg.mod import x",
        );
        assert_eq!(reference.display_name(), "..pkg.mod");
        assert_eq!(reference.absolute_import_name(), None);
    }

    #[test]
    fn absolute_import_name_only_for_level_zero() {
        let reference = Reference::new(
            ReferenceKind::Import {
                name: "os.path".to_string(),
                level: 0,
            },
            None,
            "import os.path",
        );
        assert_eq!(reference.absolute_import_name(), Some("os.path"));
    }
}
