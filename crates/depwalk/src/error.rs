//! Error types for depwalk operations.
//!
//! Errors are categorized into two main types:
//!
//! - **`Error`**: Top-level errors that halt a resolution request (root cannot
//!   be loaded, configuration is invalid, grammar failed to load)
//! - **`Problem`**: Container-level findings that are collected but never
//!   stop traversal of independent branches
//!
//! ## Error Philosophy
//!
//! Resolution is best effort:
//! - A single unresolvable import shouldn't hide the rest of the graph
//! - Problems are collected and reported, not thrown
//! - Only a root that cannot be loaded at all fails the request
//!
//! ## Problem Categorization
//!
//! `ProblemCode` uses a 4xx/5xx style categorization:
//! - Input problems (the analyzed code's fault): missing imports, dynamic paths
//! - Internal problems (the environment's fault): unreadable files

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Location;

/// Result type for depwalk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for depwalk operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The root of a resolution request could not be loaded
    #[error("cannot load root {}: {problem}", path.display())]
    RootUnavailable {
        /// Root path as supplied by the caller
        path: PathBuf,
        /// Why loading failed
        problem: Box<Problem>,
    },

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tree-sitter parsing infrastructure failed
    #[error("parser error: {0}")]
    Parser(String),

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(e.to_string())
    }
}

/// A non-fatal resolution finding attributed to one container.
///
/// Problems are collected during traversal and never halt it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Category of the problem
    pub code: ProblemCode,
    /// Human-readable message
    pub message: String,
    /// Canonical path of the container the problem originated in
    pub source_path: PathBuf,
    /// Position inside the container, when known
    pub location: Option<Location>,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source_path.display())?;
        if let Some(location) = &self.location {
            write!(f, ":{}:{}", location.span.start_line, location.span.start_column)?;
        }
        write!(f, ": {} ({})", self.message, self.code)
    }
}

impl std::error::Error for Problem {}

/// Categorization of resolution problems.
///
/// Uses a 4xx/5xx style pattern:
/// - Input problems are issues with the analyzed sources (user can fix)
/// - Internal problems are issues reading them from the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProblemCode {
    // === Input Problems (analogous to HTTP 4xx) ===
    /// Import names nothing on the allow-list, catalog, or search path
    ReferenceNotFound,

    /// Run directive names a notebook that cannot be located
    NotebookNotFound,

    /// Run call whose target is not a string literal
    DependencyNotConstant,

    /// Search-path mutation whose argument cannot be computed statically
    SysPathCannotCompute,

    /// Run directive without a usable path
    InvalidRunDirective,

    /// Source has syntax errors; extraction continued on the recoverable parts
    ParseError,

    /// Content is not valid UTF-8
    EncodingError,

    /// No resolver in the chain claimed the reference
    UnresolvedReferenceKind,

    // === Internal Problems (analogous to HTTP 5xx) ===
    /// Location does not exist
    SourceNotFound,

    /// Location exists but could not be read
    SourceUnreadable,
}

impl ProblemCode {
    /// Stable kebab-case identifier for reporting.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReferenceNotFound => "reference-not-found",
            Self::NotebookNotFound => "notebook-not-found",
            Self::DependencyNotConstant => "dependency-not-constant",
            Self::SysPathCannotCompute => "sys-path-cannot-compute",
            Self::InvalidRunDirective => "invalid-run-directive",
            Self::ParseError => "parse-error",
            Self::EncodingError => "encoding-error",
            Self::UnresolvedReferenceKind => "unresolved-reference-kind",
            Self::SourceNotFound => "source-not-found",
            Self::SourceUnreadable => "source-unreadable",
        }
    }

    /// Returns `true` if this is an input problem (4xx-style).
    #[must_use]
    pub fn is_input_problem(&self) -> bool {
        !self.is_internal_problem()
    }

    /// Returns `true` if this is an internal problem (5xx-style).
    #[must_use]
    pub fn is_internal_problem(&self) -> bool {
        matches!(self, Self::SourceNotFound | Self::SourceUnreadable)
    }
}

impl std::fmt::Display for ProblemCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Problem {
    /// Create a new problem.
    #[must_use]
    pub fn new(
        code: ProblemCode,
        source_path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source_path: source_path.into(),
            location: None,
        }
    }

    /// Attach a location inside the originating container.
    #[must_use]
    pub fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    /// Problem for a location that could not be read.
    #[must_use]
    pub fn io_error(path: PathBuf, error: &std::io::Error) -> Self {
        let code = if error.kind() == std::io::ErrorKind::NotFound {
            ProblemCode::SourceNotFound
        } else {
            ProblemCode::SourceUnreadable
        };
        let message = format!("cannot read {}: {error}", path.display());
        Self::new(code, path, message)
    }

    /// Problem for content that is not valid UTF-8.
    #[must_use]
    pub fn encoding_error(path: PathBuf) -> Self {
        Self::new(ProblemCode::EncodingError, path, "file is not valid UTF-8")
    }
}
