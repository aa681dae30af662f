//! Shared tree-sitter utilities for language support modules.
//!
//! Provides common functions for extracting text and positions from tree-sitter nodes.

// Tree-sitter returns usize for positions, but we store u32 for compactness.
// This is safe for practical source files (no file has 4 billion lines).
#![allow(clippy::cast_possible_truncation)]

use crate::types::Span;

/// Get text content of a tree-sitter node.
///
/// Returns `None` if the node's byte range contains invalid UTF-8.
pub fn node_text<'a>(node: &tree_sitter::Node, content: &'a [u8]) -> Option<&'a str> {
    match std::str::from_utf8(&content[node.byte_range()]) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::trace!(
                byte_range = ?node.byte_range(),
                error = %e,
                node_kind = %node.kind(),
                "Failed to decode node text as UTF-8"
            );
            None
        }
    }
}

/// Convert tree-sitter positions to our Span type.
///
/// Tree-sitter uses 0-indexed positions; Span uses 1-indexed.
/// Falls back to a single-character span if the node produces invalid positions.
pub fn node_span(node: &tree_sitter::Node) -> Span {
    let start_line = node.start_position().row as u32 + 1;
    let start_col = node.start_position().column as u32 + 1;
    let end_line = node.end_position().row as u32 + 1;
    let end_col = node.end_position().column as u32 + 1;

    Span::new(start_line, start_col, end_line, end_col).unwrap_or_else(|| {
        tracing::warn!(
            start_line,
            start_col,
            end_line,
            end_col,
            node_kind = %node.kind(),
            "Tree-sitter produced invalid span, using fallback"
        );
        Span::line(start_line, 1)
    })
}

/// Find the first error or missing node in document order.
pub fn first_error_node<'t>(node: tree_sitter::Node<'t>) -> Option<tree_sitter::Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error_node)
}
