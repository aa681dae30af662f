//! Python reference extraction.
//!
//! Walks a tree-sitter-python syntax tree in document order and records
//! every construct that can pull another unit into the graph:
//!
//! | Construct | Reference |
//! |-----------|-----------|
//! | `import a.b`, `from a.b import c` | `Import { name: "a.b", level: 0 }` |
//! | `from ..pkg import c` | `Import { name: "pkg", level: 2 }` |
//! | `importlib.import_module("a")`, `__import__("a")` | `Import` |
//! | `sys.path.append(p)`, `sys.path.insert(i, p)` | `PathMutation` |
//! | `dbutils.notebook.run("./nb", ...)` | `NotebookRun` |
//!
//! Dynamic arguments the walker cannot evaluate become problems rather
//! than references.

// Tree-sitter returns usize for positions, but we store u32 for compactness.
#![allow(clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};

use tracing::trace;

use super::tree_sitter_utils::{first_error_node, node_span, node_text};
use crate::error::{Error, Problem, ProblemCode, Result};
use crate::path_lookup::normalize_lexically;
use crate::types::{Location, Reference, ReferenceKind};

/// Tree-sitter node kind constants for the Python grammar.
mod node_kinds {
    pub const IMPORT_STATEMENT: &str = "import_statement";
    pub const IMPORT_FROM_STATEMENT: &str = "import_from_statement";
    pub const FUTURE_IMPORT_STATEMENT: &str = "future_import_statement";
    pub const DOTTED_NAME: &str = "dotted_name";
    pub const ALIASED_IMPORT: &str = "aliased_import";
    pub const RELATIVE_IMPORT: &str = "relative_import";
    pub const IMPORT_PREFIX: &str = "import_prefix";
    pub const CALL: &str = "call";
    pub const KEYWORD_ARGUMENT: &str = "keyword_argument";
    pub const COMMENT: &str = "comment";
    pub const STRING: &str = "string";
    pub const CONCATENATED_STRING: &str = "concatenated_string";
    pub const INTERPOLATION: &str = "interpolation";
}

/// Where the source being extracted lives.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    /// Canonical path of the container
    pub path: &'a Path,
    /// Notebook segment index, `None` for plain files
    pub segment: Option<usize>,
    /// Lines preceding the source inside the container
    pub line_offset: u32,
}

impl ExtractionContext<'_> {
    fn location(&self, node: &tree_sitter::Node) -> Option<Location> {
        Some(Location::new(
            self.segment,
            node_span(node).offset_lines(self.line_offset),
        ))
    }

    fn problem(&self, code: ProblemCode, node: &tree_sitter::Node, message: String) -> Problem {
        Problem::new(code, self.path, message).at(self.location(node))
    }
}

/// References and problems found in one piece of Python source.
#[derive(Debug, Default)]
pub struct Extraction {
    /// References in document order
    pub references: Vec<Reference>,
    /// Problems in document order
    pub problems: Vec<Problem>,
}

/// Reusable tree-sitter parser configured for Python.
///
/// Tree-sitter parsers are stateful and not `Sync`, so one lives in each
/// request's loader cache.
pub struct PythonParser {
    parser: tree_sitter::Parser,
}

impl std::fmt::Debug for PythonParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PythonParser").finish_non_exhaustive()
    }
}

impl PythonParser {
    /// Create a parser with the Python grammar loaded.
    pub fn new() -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| Error::Parser(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Extract references from `source`.
    ///
    /// Syntax errors are reported once per source and extraction continues
    /// over whatever the parser recovered.
    pub fn extract(&mut self, source: &str, ctx: &ExtractionContext<'_>) -> Extraction {
        let mut extraction = Extraction::default();
        let Some(tree) = self.parser.parse(source, None) else {
            extraction.problems.push(
                Problem::new(ProblemCode::ParseError, ctx.path, "failed to parse source")
                    .at(None),
            );
            return extraction;
        };

        let root = tree.root_node();
        if let Some(error) = first_error_node(root) {
            let span = node_span(&error).offset_lines(ctx.line_offset);
            extraction.problems.push(ctx.problem(
                ProblemCode::ParseError,
                &error,
                format!("syntax error at line {}", span.start_line),
            ));
        }

        let mut walker = Walker {
            ctx,
            content: source.as_bytes(),
            sys_aliases: vec!["sys".to_string()],
            os_aliases: vec!["os".to_string()],
            sys_path_aliases: Vec::new(),
            out: &mut extraction,
        };
        walker.walk(root);

        trace!(
            path = %ctx.path.display(),
            segment = ?ctx.segment,
            references = extraction.references.len(),
            "Extracted Python references"
        );
        extraction
    }
}

/// Document-order walk state.
///
/// Aliases are tracked as they appear so `import sys as s` followed by
/// `s.path.append(...)` is still recognized.
struct Walker<'c, 'o> {
    ctx: &'c ExtractionContext<'c>,
    content: &'c [u8],
    sys_aliases: Vec<String>,
    os_aliases: Vec<String>,
    sys_path_aliases: Vec<String>,
    out: &'o mut Extraction,
}

impl Walker<'_, '_> {
    fn walk(&mut self, node: tree_sitter::Node) {
        use node_kinds::{CALL, FUTURE_IMPORT_STATEMENT, IMPORT_FROM_STATEMENT, IMPORT_STATEMENT};

        match node.kind() {
            IMPORT_STATEMENT => {
                self.import_statement(node);
                return;
            }
            IMPORT_FROM_STATEMENT => {
                self.import_from_statement(node);
                return;
            }
            FUTURE_IMPORT_STATEMENT => return,
            CALL => self.call(node),
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children {
            self.walk(child);
        }
    }

    fn text(&self, node: &tree_sitter::Node) -> Option<&str> {
        node_text(node, self.content)
    }

    fn push(&mut self, kind: ReferenceKind, node: &tree_sitter::Node) {
        let text = self.text(node).unwrap_or_default().trim().to_string();
        let location = self.ctx.location(node);
        self.out.references.push(Reference::new(kind, location, text));
    }

    /// `import a.b, c as d`
    fn import_statement(&mut self, node: tree_sitter::Node) {
        use node_kinds::{ALIASED_IMPORT, DOTTED_NAME};

        let mut cursor = node.walk();
        let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();
        for name_node in names {
            let (name, alias) = match name_node.kind() {
                DOTTED_NAME => (self.text(&name_node).map(str::to_string), None),
                ALIASED_IMPORT => (
                    name_node
                        .child_by_field_name("name")
                        .and_then(|n| self.text(&n))
                        .map(str::to_string),
                    name_node
                        .child_by_field_name("alias")
                        .and_then(|n| self.text(&n))
                        .map(str::to_string),
                ),
                _ => continue,
            };
            let Some(name) = name else { continue };
            if let Some(alias) = alias {
                match name.as_str() {
                    "sys" => self.sys_aliases.push(alias),
                    "os" => self.os_aliases.push(alias),
                    _ => {}
                }
            }
            self.push(ReferenceKind::Import { name, level: 0 }, &node);
        }
    }

    /// `from a.b import c`, `from . import c`, `from ..pkg import *`
    fn import_from_statement(&mut self, node: tree_sitter::Node) {
        use node_kinds::{ALIASED_IMPORT, DOTTED_NAME, IMPORT_PREFIX, RELATIVE_IMPORT};

        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };

        let (module_name, level) = match module.kind() {
            DOTTED_NAME => (self.text(&module).unwrap_or_default().to_string(), 0),
            RELATIVE_IMPORT => {
                let mut cursor = module.walk();
                let mut level = 0;
                let mut name = String::new();
                for child in module.children(&mut cursor) {
                    match child.kind() {
                        IMPORT_PREFIX => {
                            level = self.text(&child).map_or(0, |t| t.matches('.').count());
                        }
                        DOTTED_NAME => name = self.text(&child).unwrap_or_default().to_string(),
                        _ => {}
                    }
                }
                (name, level as u32)
            }
            _ => return,
        };

        let mut cursor = node.walk();
        let imported: Vec<(String, Option<String>)> = node
            .children_by_field_name("name", &mut cursor)
            .filter_map(|n| match n.kind() {
                DOTTED_NAME => Some((self.text(&n)?.to_string(), None)),
                ALIASED_IMPORT => Some((
                    self.text(&n.child_by_field_name("name")?)?.to_string(),
                    n.child_by_field_name("alias")
                        .and_then(|a| self.text(&a))
                        .map(str::to_string),
                )),
                _ => None,
            })
            .collect();

        if level == 0 && module_name == "sys" {
            for (name, alias) in &imported {
                if name == "path" {
                    self.sys_path_aliases
                        .push(alias.clone().unwrap_or_else(|| name.clone()));
                }
            }
        }

        if module_name.is_empty() {
            // `from . import a, b` names sibling modules directly.
            for (name, _) in imported {
                self.push(ReferenceKind::Import { name, level }, &node);
            }
        } else {
            self.push(
                ReferenceKind::Import {
                    name: module_name,
                    level,
                },
                &node,
            );
        }
    }

    fn call(&mut self, node: tree_sitter::Node) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let Some(callee) = self.text(&function).map(compact) else {
            return;
        };
        let args = positional_args(&node);

        if let Some(index) = self.sys_path_mutation_arg(&callee) {
            self.sys_path_mutation(node, &callee, args.get(index).copied());
        } else if callee == "dbutils.notebook.run" {
            match args.first().and_then(|a| self.literal(*a)) {
                Some(path) => self.push(ReferenceKind::NotebookRun { path }, &node),
                None => self.out.problems.push(self.ctx.problem(
                    ProblemCode::DependencyNotConstant,
                    &node,
                    "can't check dependency not provided as a constant".to_string(),
                )),
            }
        } else if callee == "importlib.import_module" || callee == "__import__" {
            match args.first().and_then(|a| self.literal(*a)) {
                Some(name) => {
                    let level = name.chars().take_while(|c| *c == '.').count();
                    let name = name[level..].to_string();
                    self.push(
                        ReferenceKind::Import {
                            name,
                            level: level as u32,
                        },
                        &node,
                    );
                }
                None => self.out.problems.push(self.ctx.problem(
                    ProblemCode::DependencyNotConstant,
                    &node,
                    "can't check dependency not provided as a constant".to_string(),
                )),
            }
        }
    }

    /// Index of the path argument if `callee` mutates `sys.path`.
    fn sys_path_mutation_arg(&self, callee: &str) -> Option<usize> {
        let (receiver, method) = callee.rsplit_once('.')?;
        let is_sys_path = self
            .sys_aliases
            .iter()
            .any(|alias| receiver.strip_prefix(alias.as_str()) == Some(".path"))
            || self.sys_path_aliases.iter().any(|alias| receiver == alias);
        if !is_sys_path {
            return None;
        }
        match method {
            "append" => Some(0),
            "insert" => Some(1),
            _ => None,
        }
    }

    fn sys_path_mutation(
        &mut self,
        node: tree_sitter::Node,
        callee: &str,
        arg: Option<tree_sitter::Node>,
    ) {
        let Some(value) = arg.and_then(|a| self.path_value(a)) else {
            self.out.problems.push(self.ctx.problem(
                ProblemCode::SysPathCannotCompute,
                &node,
                format!("can't update sys.path from {callee}: path is not a constant"),
            ));
            return;
        };
        let value = PathBuf::from(value);
        let directory = if value.is_absolute() {
            normalize_lexically(&value)
        } else {
            let base = self.ctx.path.parent().unwrap_or_else(|| Path::new("/"));
            normalize_lexically(&base.join(value))
        };
        self.push(ReferenceKind::PathMutation { directory }, &node);
    }

    /// Evaluate a path expression: a literal, or `os.path.abspath/normpath/realpath/join` of literals.
    fn path_value(&self, node: tree_sitter::Node) -> Option<String> {
        use node_kinds::CALL;

        if node.kind() != CALL {
            return self.literal(node);
        }
        let callee = compact(self.text(&node.child_by_field_name("function")?)?);
        let (receiver, method) = callee.rsplit_once('.')?;
        let is_os_path = self
            .os_aliases
            .iter()
            .any(|alias| receiver.strip_prefix(alias.as_str()) == Some(".path"));
        if !is_os_path {
            return None;
        }
        let args = positional_args(&node);
        match method {
            "abspath" | "normpath" | "realpath" => self.path_value(*args.first()?),
            "join" => {
                let mut joined = PathBuf::new();
                for arg in args {
                    joined.push(self.path_value(arg)?);
                }
                Some(joined.to_string_lossy().into_owned())
            }
            _ => None,
        }
    }

    /// Value of a plain string literal; `None` for f-strings with interpolation or bytes.
    fn literal(&self, node: tree_sitter::Node) -> Option<String> {
        use node_kinds::{CONCATENATED_STRING, INTERPOLATION, STRING};

        match node.kind() {
            STRING => {
                let mut cursor = node.walk();
                if node.children(&mut cursor).any(|c| c.kind() == INTERPOLATION) {
                    return None;
                }
                unquote(self.text(&node)?)
            }
            CONCATENATED_STRING => {
                let mut cursor = node.walk();
                let parts: Vec<_> = node.named_children(&mut cursor).collect();
                parts
                    .into_iter()
                    .map(|part| self.literal(part))
                    .collect::<Option<Vec<_>>>()
                    .map(|parts| parts.concat())
            }
            _ => None,
        }
    }
}

/// Positional arguments of a call, skipping keywords and comments.
fn positional_args<'t>(call: &tree_sitter::Node<'t>) -> Vec<tree_sitter::Node<'t>> {
    use node_kinds::{COMMENT, KEYWORD_ARGUMENT};

    let Some(arguments) = call.child_by_field_name("arguments") else {
        return Vec::new();
    };
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|n| n.kind() != KEYWORD_ARGUMENT && n.kind() != COMMENT)
        .collect()
}

/// Remove whitespace so `sys . path.append` matches `sys.path.append`.
fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Strip string prefix and quotes from a literal's source text.
fn unquote(text: &str) -> Option<String> {
    let body_start = text.find(['\'', '"'])?;
    let prefix = &text[..body_start];
    if prefix.chars().any(|c| c.eq_ignore_ascii_case(&'b')) {
        return None;
    }
    let body = &text[body_start..];
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = body
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(inner.to_string());
        }
    }
    None
}
