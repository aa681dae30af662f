//! Integration tests for notebook roots and run directives.
//!
//! Covers:
//! - `%run` chains across sibling notebooks
//! - Document order of directives and search-path mutations
//! - `dbutils.notebook.run` with constant and dynamic targets
//! - Non-Python notebooks and `%python` magic cells

use std::fs;
use std::path::{Path, PathBuf};

use depwalk::{
    ContainerKind, DependencyGraph, DependencyKind, DependencyResolver, Error, PathLookup,
    ProblemCode, SitePackages, Whitelist,
};
use tempfile::TempDir;

const HEADER: &str = "# Databricks notebook source\n";
const SEPARATOR: &str = "\n# COMMAND ----------\n\n";

/// Create a temporary tree with the given files.
fn tree_with_files(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("should create temp dir");

    for (path, content) in files {
        let full_path = dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("should create parent dirs");
        }
        fs::write(&full_path, content).expect("should write file");
    }

    dir
}

/// Notebook source with the given Python cells.
fn notebook(cells: &[&str]) -> String {
    format!("{HEADER}{}\n", cells.join(SEPARATOR))
}

fn resolver(dir: &Path) -> DependencyResolver {
    DependencyResolver::standard(
        Whitelist::default(),
        SitePackages::default(),
        PathLookup::new(dir, Vec::new()),
    )
}

fn build(dir: &Path, root: &str) -> DependencyGraph {
    resolver(dir)
        .build_dependency_graph(&dir.join(root))
        .expect("root should load")
}

fn canonical(dir: &Path, relative: &str) -> PathBuf {
    dir.join(relative).canonicalize().expect("file should exist")
}

#[test]
fn run_directive_to_sibling_that_imports_two_levels_up() {
    let dir = tree_with_files(&[
        ("ws/team/jobs/root.py", notebook(&["# MAGIC %run ./child"]).as_str()),
        ("ws/team/jobs/child.py", notebook(&["from ...common import helper"]).as_str()),
        ("ws/common.py", "def helper():\n    pass\n"),
    ]);

    let graph = build(dir.path(), "ws/team/jobs/root.py");

    assert_eq!(graph.len(), 3, "{:?}", graph.all_relative_names());
    assert!(graph.is_problem_free(), "{:?}", graph.problems());
    let root = graph.get(graph.root()).unwrap();
    assert_eq!(root.kind(), ContainerKind::Notebook);
    let child = canonical(dir.path(), "ws/team/jobs/child.py");
    assert_eq!(graph.get(&child).unwrap().kind(), ContainerKind::Notebook);
    assert_eq!(graph.edges()[0].kind, DependencyKind::Run);
    assert_eq!(graph.edges()[1].kind, DependencyKind::Import);
}

#[test]
fn directive_before_mutation_does_not_see_it() {
    let dir = tree_with_files(&[
        (
            "root.py",
            notebook(&[
                "# MAGIC %run ./early",
                "import sys\nsys.path.append('lib')",
                "# MAGIC %run ./late",
            ]).as_str(),
        ),
        ("early.py", notebook(&["import only_in_lib"]).as_str()),
        ("late.py", notebook(&["import only_in_lib"]).as_str()),
        ("lib/only_in_lib.py", ""),
    ]);

    let graph = build(dir.path(), "root.py");

    assert_eq!(graph.len(), 4);
    assert_eq!(graph.problems().len(), 1);
    let problem = &graph.problems()[0];
    assert_eq!(problem.code, ProblemCode::ReferenceNotFound);
    assert_eq!(problem.source_path, canonical(dir.path(), "early.py"));
}

#[test]
fn missing_run_target_is_attributed_to_its_cell() {
    let dir = tree_with_files(&[(
        "root.py",
        notebook(&["import os", "# MAGIC %run ./does_not_exist"]).as_str(),
    )]);

    let graph = build(dir.path(), "root.py");

    assert_eq!(graph.len(), 1);
    assert_eq!(graph.problems().len(), 1);
    let problem = &graph.problems()[0];
    assert_eq!(problem.code, ProblemCode::NotebookNotFound);
    let location = problem.location.expect("problem should carry a location");
    assert_eq!(location.segment, Some(1));
    assert_eq!(location.span.start_line, 5);
}

#[test]
fn run_without_path_is_invalid() {
    let dir = tree_with_files(&[("root.py", notebook(&["# MAGIC %run"]).as_str())]);

    let graph = build(dir.path(), "root.py");

    assert_eq!(graph.problems().len(), 1);
    assert_eq!(graph.problems()[0].code, ProblemCode::InvalidRunDirective);
}

#[test]
fn constant_notebook_run_call_is_followed() {
    let dir = tree_with_files(&[
        (
            "root.py",
            notebook(&["dbutils.notebook.run('./task', 600, {'x': '1'})"]).as_str(),
        ),
        ("task.py", notebook(&["x = 1"]).as_str()),
    ]);

    let graph = build(dir.path(), "root.py");

    assert_eq!(graph.len(), 2);
    assert!(graph.is_problem_free());
    assert_eq!(graph.edges()[0].kind, DependencyKind::NotebookRun);
}

#[test]
fn dynamic_notebook_run_call_is_reported() {
    let dir = tree_with_files(&[(
        "root.py",
        notebook(&["name = './task'\ndbutils.notebook.run(name, 600)"]).as_str(),
    )]);

    let graph = build(dir.path(), "root.py");

    assert_eq!(graph.len(), 1);
    assert_eq!(graph.problems().len(), 1);
    assert_eq!(graph.problems()[0].code, ProblemCode::DependencyNotConstant);
}

#[test]
fn run_cycle_between_notebooks_terminates() {
    let dir = tree_with_files(&[
        ("a.py", notebook(&["# MAGIC %run ./b"]).as_str()),
        ("b.py", notebook(&["# MAGIC %run ./a"]).as_str()),
    ]);

    let graph = build(dir.path(), "a.py");

    assert_eq!(graph.len(), 2);
    assert!(graph.is_problem_free());
    assert_eq!(graph.detect_cycles().len(), 1);
}

#[test]
fn sql_notebook_runs_python_magic_cells() {
    let dir = tree_with_files(&[
        (
            "report.sql",
            "-- Databricks notebook source\nSELECT 1\n\n-- COMMAND ----------\n\n-- MAGIC %python\n-- MAGIC import helper\n\n-- COMMAND ----------\n\n-- MAGIC %run ./setup\n",
        ),
        ("helper.py", ""),
        ("setup.py", notebook(&["x = 1"]).as_str()),
    ]);

    let graph = build(dir.path(), "report.sql");

    assert!(graph.is_problem_free(), "{:?}", graph.problems());
    assert_eq!(graph.len(), 3);
    let names = graph.all_relative_names();
    assert!(names.contains("helper.py"));
    assert!(names.contains("setup.py"));
}

#[test]
fn imported_notebook_is_loaded_as_notebook() {
    let dir = tree_with_files(&[
        ("main.py", "import shared_nb\n"),
        ("shared_nb.py", notebook(&["# MAGIC %run ./inner"]).as_str()),
        ("inner.py", notebook(&["x = 1"]).as_str()),
    ]);

    let graph = build(dir.path(), "main.py");

    assert_eq!(graph.len(), 3);
    assert_eq!(
        graph.containers().filter(|c| c.kind() == ContainerKind::Notebook).count(),
        2
    );
}

#[test]
fn notebook_entry_point_requires_header() {
    let dir = tree_with_files(&[("plain.py", "import os\n")]);

    let err = resolver(dir.path())
        .build_notebook_dependency_graph(&dir.path().join("plain.py"))
        .unwrap_err();

    assert!(matches!(err, Error::RootUnavailable { .. }));
}

#[test]
fn run_target_found_through_absolute_appended_dir() {
    let dir = tree_with_files(&[(
        "some_folder/some_notebook.py",
        "# Databricks notebook source_code\nwhatever = 12\n",
    )]);
    let folder = canonical(dir.path(), "some_folder");
    fs::write(
        dir.path().join("run_notebook.py"),
        format!(
            "# Databricks notebook source_code\nimport sys\n\nsys.path.append('{}')\n{SEPARATOR}# MAGIC %run some_notebook\n",
            folder.display()
        ),
    )
    .expect("should write root");

    let graph = resolver(dir.path())
        .build_notebook_dependency_graph(&dir.path().join("run_notebook.py"))
        .expect("root should load");

    assert_eq!(graph.len(), 2, "{:?}", graph.all_relative_names());
    assert!(graph.is_problem_free(), "{:?}", graph.problems());
    let target = canonical(dir.path(), "some_folder/some_notebook.py");
    assert_eq!(graph.get(&target).unwrap().kind(), ContainerKind::Notebook);
    assert_eq!(graph.edges()[0].kind, DependencyKind::Run);
}

#[test]
fn run_of_imported_plain_file_is_still_rejected() {
    let dir = tree_with_files(&[
        (
            "imports_then_runs.py",
            notebook(&["import plain", "# MAGIC %run ./plain"]).as_str(),
        ),
        ("runs_only.py", notebook(&["# MAGIC %run ./plain"]).as_str()),
        ("plain.py", "x = 1\n"),
    ]);

    let both = build(dir.path(), "imports_then_runs.py");
    let run_only = build(dir.path(), "runs_only.py");

    assert_eq!(both.len(), 2);
    assert_eq!(both.edges().len(), 1);
    assert_eq!(both.edges()[0].kind, DependencyKind::Import);
    let codes: Vec<_> = both.problems().iter().map(|p| p.code).collect();
    assert_eq!(codes, vec![ProblemCode::ParseError]);
    assert_eq!(
        both.problems()[0].source_path,
        canonical(dir.path(), "imports_then_runs.py")
    );

    assert_eq!(run_only.len(), 1);
    let codes: Vec<_> = run_only.problems().iter().map(|p| p.code).collect();
    assert_eq!(codes, vec![ProblemCode::ParseError]);
}

#[test]
fn local_file_entry_point_honors_notebook_header() {
    let dir = tree_with_files(&[
        ("root.py", notebook(&["# MAGIC %run ./child"]).as_str()),
        ("child.py", notebook(&["x = 1"]).as_str()),
    ]);

    let graph = resolver(dir.path())
        .build_local_file_dependency_graph(&dir.path().join("root.py"))
        .expect("root should load");

    assert_eq!(graph.len(), 2);
    assert!(graph.is_problem_free(), "{:?}", graph.problems());
    assert_eq!(graph.get(graph.root()).unwrap().kind(), ContainerKind::Notebook);
}
