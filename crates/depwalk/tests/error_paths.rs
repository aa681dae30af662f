//! Integration tests for failure handling.
//!
//! Only a root that cannot be loaded fails a request. Everything found
//! below the root becomes a problem attributed to the referencing site.

use std::fs;
use std::path::Path;

use depwalk::{DependencyResolver, Error, PathLookup, ProblemCode, SitePackages, Whitelist};
use tempfile::TempDir;

fn resolver_for(dir: &Path) -> DependencyResolver {
    DependencyResolver::standard(
        Whitelist::default(),
        SitePackages::default(),
        PathLookup::new(dir, Vec::new()),
    )
}

#[test]
fn missing_root_returns_no_graph() {
    let dir = TempDir::new().unwrap();

    let err = resolver_for(dir.path())
        .build_dependency_graph(&dir.path().join("missing.py"))
        .unwrap_err();

    match err {
        Error::RootUnavailable { path, problem } => {
            assert!(path.ends_with("missing.py"));
            assert_eq!(problem.code, ProblemCode::SourceNotFound);
            assert!(problem.code.is_internal_problem());
        }
        other => panic!("expected RootUnavailable, got {other:?}"),
    }
}

#[test]
fn root_that_is_a_directory_is_unavailable() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("pkg")).unwrap();

    let result = resolver_for(dir.path()).build_local_file_dependency_graph(&dir.path().join("pkg"));

    assert!(matches!(result, Err(Error::RootUnavailable { .. })));
}

#[test]
fn undecodable_child_abandons_only_its_subtree() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.py"), "import binary\nimport fine\n").unwrap();
    fs::write(dir.path().join("binary.py"), [0xff, 0xfe, 0xfd]).unwrap();
    fs::write(dir.path().join("fine.py"), "").unwrap();

    let graph = resolver_for(dir.path())
        .build_dependency_graph(&dir.path().join("main.py"))
        .unwrap();

    assert_eq!(graph.len(), 2);
    assert_eq!(graph.problems().len(), 1);
    let problem = &graph.problems()[0];
    assert_eq!(problem.code, ProblemCode::EncodingError);
    assert_eq!(
        problem.source_path,
        dir.path().join("main.py").canonicalize().unwrap()
    );
    assert!(problem.location.is_some());
}

#[test]
fn syntax_errors_do_not_stop_extraction() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("main.py"),
        "import first\ndef broken(:\n    pass\nimport second\n",
    )
    .unwrap();
    fs::write(dir.path().join("first.py"), "").unwrap();
    fs::write(dir.path().join("second.py"), "").unwrap();

    let graph = resolver_for(dir.path())
        .build_dependency_graph(&dir.path().join("main.py"))
        .unwrap();

    assert!(graph
        .problems()
        .iter()
        .any(|p| p.code == ProblemCode::ParseError));
    assert!(graph.len() >= 2, "recoverable imports should still resolve");
}

#[test]
fn dynamic_import_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("main.py"),
        "import importlib\nmod = importlib.import_module(name)\nother = importlib.import_module('helper')\n",
    )
    .unwrap();
    fs::write(dir.path().join("helper.py"), "").unwrap();

    let graph = resolver_for(dir.path())
        .build_dependency_graph(&dir.path().join("main.py"))
        .unwrap();

    assert_eq!(graph.len(), 2);
    assert_eq!(graph.problems().len(), 1);
    assert_eq!(graph.problems()[0].code, ProblemCode::DependencyNotConstant);
}

#[test]
fn problems_display_with_location_and_code() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("main.py"), "\n\nimport nowhere\n").unwrap();

    let graph = resolver_for(dir.path())
        .build_dependency_graph(&dir.path().join("main.py"))
        .unwrap();

    let rendered = graph.problems()[0].to_string();
    assert!(rendered.contains("main.py:3:1"), "{rendered}");
    assert!(rendered.ends_with("(reference-not-found)"), "{rendered}");
}
