//! Language-specific reference extraction.
//!
//! Each supported source language turns a syntax tree into the ordered list
//! of raw `Reference`s a container emits. Only Python carries import
//! semantics; other notebook cell languages contribute directives only.

pub mod python;
pub(crate) mod tree_sitter_utils;

pub use python::{Extraction, ExtractionContext, PythonParser};
