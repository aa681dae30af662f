//! Common display utilities for CLI commands.

use colored::Colorize;
use depwalk::{ContainerKind, DependencyGraph, Problem};

const MAX_DISPLAY_ITEMS: usize = 10;

/// Colored label for a container kind.
pub fn kind_label(kind: ContainerKind) -> colored::ColoredString {
    match kind {
        ContainerKind::File => kind.as_str().cyan(),
        ContainerKind::Notebook => kind.as_str().magenta(),
        ContainerKind::InstalledPackage => kind.as_str().blue(),
    }
}

/// Print one problem with its location relative to the graph's display root.
pub fn print_problem(graph: &DependencyGraph, problem: &Problem) {
    let mut location = graph.relative_name(&problem.source_path);
    if let Some(loc) = &problem.location {
        location.push_str(&format!(":{}:{}", loc.span.start_line, loc.span.start_column));
    }
    let code = if problem.code.is_internal_problem() {
        problem.code.as_str().red().bold()
    } else {
        problem.code.as_str().yellow().bold()
    };
    println!("  {} {} {}", location.white().bold(), code, problem.message);
}

/// Print a list of names with truncation.
///
/// Shows up to `MAX_DISPLAY_ITEMS` names with bullet points. If there are
/// more, shows "... and N more". If empty, shows `empty_message`.
pub fn print_names<'a>(names: impl ExactSizeIterator<Item = &'a str>, empty_message: &str) {
    let total = names.len();
    if total == 0 {
        println!("    {}", empty_message.dimmed());
        return;
    }

    for name in names.take(MAX_DISPLAY_ITEMS) {
        println!("    {} {name}", "•".dimmed());
    }

    if total > MAX_DISPLAY_ITEMS {
        println!("    {} ... and {} more", "•".dimmed(), total - MAX_DISPLAY_ITEMS);
    }
}
