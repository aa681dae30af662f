//! Notebook source format.
//!
//! A notebook exported as source is a plain file whose first line is a
//! header comment and whose cells are separated by marker comments:
//!
//! ```text
//! # Databricks notebook source
//! import helpers
//!
//! # COMMAND ----------
//!
//! # MAGIC %run ./shared/setup
//! ```
//!
//! Lines of cells written in another language (or using a magic command)
//! carry a `MAGIC` prefix after the comment marker. The comment marker
//! depends on the notebook's default language: `#` for Python and R, `--`
//! for SQL, `//` for Scala.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Problem, ProblemCode};
use crate::types::{Location, Reference, ReferenceKind, Span};

/// Text after the comment marker on the first line of a notebook.
pub const NOTEBOOK_HEADER: &str = "Databricks notebook source";
/// Text after the comment marker on a cell separator line.
pub const CELL_SEPARATOR: &str = "COMMAND ----------";
/// Marker for lines of a magic cell.
pub const MAGIC_PREFIX: &str = "MAGIC";

/// Default language of a notebook, determined by its file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotebookLanguage {
    /// `.py` notebooks
    Python,
    /// `.sql` notebooks
    Sql,
    /// `.scala` notebooks
    Scala,
    /// `.r` notebooks
    R,
}

impl NotebookLanguage {
    /// Detect the notebook language from a file extension (Python if unknown).
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("sql") => Self::Sql,
            Some("scala") => Self::Scala,
            Some("r") => Self::R,
            _ => Self::Python,
        }
    }

    /// Line comment marker for this language.
    #[must_use]
    pub fn comment_prefix(&self) -> &'static str {
        match self {
            Self::Python | Self::R => "#",
            Self::Sql => "--",
            Self::Scala => "//",
        }
    }

    fn cell_language(self) -> CellLanguage {
        match self {
            Self::Python => CellLanguage::Python,
            Self::Sql => CellLanguage::Sql,
            Self::Scala => CellLanguage::Scala,
            Self::R => CellLanguage::R,
        }
    }
}

/// Language or magic command of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellLanguage {
    /// Python code, native or `%python`
    Python,
    /// `%sql`
    Sql,
    /// `%scala`
    Scala,
    /// `%r`
    R,
    /// `%md`
    Markdown,
    /// `%sh`
    Shell,
    /// `%pip`
    Pip,
    /// `%run`
    Run,
}

impl CellLanguage {
    fn from_magic(command: &str) -> Option<Self> {
        match command {
            "%python" => Some(Self::Python),
            "%sql" => Some(Self::Sql),
            "%scala" => Some(Self::Scala),
            "%r" => Some(Self::R),
            "%md" | "%md-sandbox" => Some(Self::Markdown),
            "%sh" => Some(Self::Shell),
            "%pip" => Some(Self::Pip),
            "%run" => Some(Self::Run),
            _ => None,
        }
    }
}

/// One logical cell of a notebook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Position of the cell in the notebook (0-indexed)
    pub index: usize,
    /// Cell language
    pub language: CellLanguage,
    /// File line of the first cell line (1-indexed)
    pub start_line: u32,
    /// File line of the last cell line (1-indexed, inclusive)
    pub end_line: u32,
    /// Cell source with magic prefixes removed; one line per file line
    pub source: String,
}

impl Segment {
    /// Lines preceding the cell in the file, for offsetting parsed spans.
    #[must_use]
    pub fn line_offset(&self) -> u32 {
        self.start_line - 1
    }
}

/// Whether the first line of `content` opens with the notebook header for
/// `path`'s language.
///
/// Anything after the header text is ignored, so exported variants such as
/// `# Databricks notebook source_code` still count.
#[must_use]
pub fn is_notebook(path: &Path, content: &str) -> bool {
    let prefix = NotebookLanguage::from_path(path).comment_prefix();
    content
        .lines()
        .next()
        .and_then(|line| line.trim().strip_prefix(prefix))
        .is_some_and(|rest| rest.trim_start().starts_with(NOTEBOOK_HEADER))
}

/// Split notebook content into cells.
///
/// The header line belongs to no cell. Line numbers are preserved: every
/// cell source has exactly as many lines as the file region it came from.
#[must_use]
pub fn split_segments(content: &str, language: NotebookLanguage) -> Vec<Segment> {
    let prefix = language.comment_prefix();
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start_line = 2;

    #[allow(clippy::cast_possible_truncation)]
    for (number, line) in content.lines().enumerate().skip(1) {
        let line_number = number as u32 + 1;
        if is_marker(line, prefix, CELL_SEPARATOR) {
            push_segment(&mut segments, &current, start_line, language);
            current.clear();
            start_line = line_number + 1;
        } else {
            current.push(line);
        }
    }
    push_segment(&mut segments, &current, start_line, language);
    segments
}

fn is_marker(line: &str, prefix: &str, marker: &str) -> bool {
    line.trim()
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.trim() == marker)
}

#[allow(clippy::cast_possible_truncation)]
fn push_segment(
    segments: &mut Vec<Segment>,
    lines: &[&str],
    start_line: u32,
    language: NotebookLanguage,
) {
    if lines.iter().all(|l| l.trim().is_empty()) {
        return;
    }
    let prefix = language.comment_prefix();
    let is_magic = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .all(|l| strip_magic(l, prefix).is_some());

    let (cell_language, source) = if is_magic {
        let stripped: Vec<&str> = lines
            .iter()
            .map(|l| strip_magic(l, prefix).unwrap_or(""))
            .collect();
        let command = stripped
            .iter()
            .find(|l| !l.trim().is_empty())
            .and_then(|l| l.split_whitespace().next())
            .unwrap_or_default();
        match CellLanguage::from_magic(command) {
            Some(CellLanguage::Python) => {
                // Blank the `%python` line so the rest parses as Python.
                let mut blanked = false;
                let body: Vec<&str> = stripped
                    .iter()
                    .map(|l| {
                        if !blanked && l.trim() == "%python" {
                            blanked = true;
                            ""
                        } else {
                            *l
                        }
                    })
                    .collect();
                (CellLanguage::Python, body.join("\n"))
            }
            Some(cell) => (cell, stripped.join("\n")),
            None => (language.cell_language(), stripped.join("\n")),
        }
    } else {
        (language.cell_language(), lines.join("\n"))
    };

    segments.push(Segment {
        index: segments.len(),
        language: cell_language,
        start_line,
        end_line: start_line + lines.len().saturating_sub(1) as u32,
        source,
    });
}

/// Remove `<prefix> MAGIC` and one following space from a line.
fn strip_magic<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = line.trim_start().strip_prefix(prefix)?.trim_start();
    let rest = rest.strip_prefix(MAGIC_PREFIX)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Extract `%run` directives from a run cell.
///
/// Each `%run` line yields one directive; a `%run` without a path yields an
/// `invalid-run-directive` problem instead.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn run_directives(segment: &Segment, path: &Path) -> (Vec<Reference>, Vec<Problem>) {
    let mut references = Vec::new();
    let mut problems = Vec::new();

    for (offset, line) in segment.source.lines().enumerate() {
        let trimmed = line.trim();
        let Some(args) = trimmed.strip_prefix("%run") else {
            continue;
        };
        if !args.is_empty() && !args.starts_with(char::is_whitespace) {
            continue;
        }
        let line_number = segment.start_line + offset as u32;
        let location = Some(Location::new(
            Some(segment.index),
            Span::line(line_number, line.chars().count() as u32),
        ));
        match run_target(args.trim()) {
            Some(target) => references.push(Reference::new(
                ReferenceKind::RunDirective { path: target },
                location,
                trimmed,
            )),
            None => problems.push(
                Problem::new(
                    ProblemCode::InvalidRunDirective,
                    path,
                    format!("missing notebook path in: {trimmed}"),
                )
                .at(location),
            ),
        }
    }

    if references.is_empty() && problems.is_empty() {
        debug!(
            path = %path.display(),
            segment = segment.index,
            "Run cell without %run line"
        );
    }
    (references, problems)
}

/// First argument of a `%run` line, honoring quotes.
fn run_target(args: &str) -> Option<String> {
    let first = args.chars().next()?;
    if first == '"' || first == '\'' {
        let rest = &args[1..];
        let end = rest.find(first)?;
        let target = &rest[..end];
        return (!target.is_empty()).then(|| target.to_string());
    }
    args.split_whitespace().next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const NOTEBOOK: &str = "# Databricks notebook source
import os

# COMMAND ----------

# MAGIC %run ./setup

# COMMAND ----------

# MAGIC %md
# MAGIC # Title

# COMMAND ----------

# MAGIC %python
# MAGIC import helpers
";

    #[test]
    fn detects_header_per_language() {
        assert!(is_notebook(Path::new("a.py"), NOTEBOOK));
        assert!(is_notebook(
            Path::new("q.sql"),
            "-- Databricks notebook source\nSELECT 1"
        ));
        assert!(!is_notebook(Path::new("a.py"), "import os\n"));
        assert!(!is_notebook(Path::new("q.sql"), NOTEBOOK));
    }

    #[test]
    fn header_is_matched_as_a_prefix() {
        let path = Path::new("a.py");
        assert!(is_notebook(path, "# Databricks notebook source_code
x = 1
"));
        assert!(is_notebook(path, "#Databricks notebook source
"));
        assert!(!is_notebook(path, "# Databricks notebook
"));
        assert!(!is_notebook(path, "x = 1
# Databricks notebook source
"));
    }

    #[test]
    fn splits_into_classified_segments() {
        let segments = split_segments(NOTEBOOK, NotebookLanguage::Python);
        let languages: Vec<_> = segments.iter().map(|s| s.language).collect();
        assert_eq!(
            languages,
            vec![
                CellLanguage::Python,
                CellLanguage::Run,
                CellLanguage::Markdown,
                CellLanguage::Python
            ]
        );
        assert_eq!(segments[0].start_line, 2);
        assert_eq!(segments[1].start_line, 5);
        assert_eq!(
            segments.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn magic_python_keeps_line_numbers() {
        let segments = split_segments(NOTEBOOK, NotebookLanguage::Python);
        let python = &segments[3];
        let lines: Vec<_> = python.source.lines().collect();
        let import_offset = lines
            .iter()
            .position(|l| l.trim() == "import helpers")
            .unwrap();
        assert_eq!(python.start_line as usize + import_offset, 16);
        assert!(!python.source.contains("%python"));
    }

    #[test]
    fn run_directive_location_points_at_line() {
        let segments = split_segments(NOTEBOOK, NotebookLanguage::Python);
        let (refs, problems) = run_directives(&segments[1], Path::new("/nb.py"));
        assert!(problems.is_empty());
        assert_eq!(
            refs[0].kind,
            ReferenceKind::RunDirective {
                path: "./setup".to_string()
            }
        );
        let location = refs[0].location.unwrap();
        assert_eq!(location.segment, Some(1));
        assert_eq!(location.span.start_line, 6);
    }

    #[test]
    fn run_without_path_is_a_problem() {
        let content = "# Databricks notebook source\n# MAGIC %run\n";
        let segments = split_segments(content, NotebookLanguage::Python);
        let (refs, problems) = run_directives(&segments[0], Path::new("/nb.py"));
        assert!(refs.is_empty());
        assert_eq!(problems[0].code, ProblemCode::InvalidRunDirective);
    }

    #[test]
    fn sql_notebook_uses_dash_comments() {
        let content =
            "-- Databricks notebook source\nSELECT 1\n\n-- COMMAND ----------\n\n-- MAGIC %run ../common\n";
        let segments = split_segments(content, NotebookLanguage::Sql);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].language, CellLanguage::Sql);
        assert_eq!(segments[1].language, CellLanguage::Run);
    }

    #[rstest]
    #[case::plain("./a/b", Some("./a/b"))]
    #[case::with_args("./a $x=\"1\"", Some("./a"))]
    #[case::double_quoted("\"./with space\" $y=2", Some("./with space"))]
    #[case::single_quoted("'./q'", Some("./q"))]
    #[case::unterminated("\"./oops", None)]
    #[case::empty("", None)]
    fn parses_run_targets(#[case] args: &str, #[case] expected: Option<&str>) {
        assert_eq!(run_target(args).as_deref(), expected);
    }

    #[rstest]
    #[case::python("nb.py", NotebookLanguage::Python)]
    #[case::sql("nb.SQL", NotebookLanguage::Sql)]
    #[case::scala("nb.scala", NotebookLanguage::Scala)]
    #[case::r("nb.r", NotebookLanguage::R)]
    #[case::no_extension("nb", NotebookLanguage::Python)]
    fn language_from_extension(#[case] path: &str, #[case] expected: NotebookLanguage) {
        assert_eq!(NotebookLanguage::from_path(Path::new(path)), expected);
    }
}
