//! Integration tests for installed packages and configuration.

use std::fs;
use std::path::Path;

use depwalk::{
    CONFIG_FILE_NAME, ContainerKind, DependencyResolver, PathLookup, ProblemCode,
    ResolverConfig, SitePackages, Whitelist,
};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("should create parent dirs");
    }
    fs::write(path, content).expect("should write file");
}

#[test]
fn installed_packages_are_opaque_leaves() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "main.py", "import yaml\nfrom requests.adapters import HTTPAdapter\n");
    write(dir.path(), "site/PyYAML-6.0.1.dist-info/top_level.txt", "yaml\n_yaml\n");
    write(
        dir.path(),
        "site/requests-2.31.0.dist-info/RECORD",
        "requests/__init__.py,,\nrequests/adapters.py,,\n",
    );
    write(dir.path(), "site/yaml/__init__.py", "import does_not_matter\n");
    let packages = SitePackages::parse(&dir.path().join("site")).unwrap();
    let resolver = DependencyResolver::standard(
        Whitelist::default(),
        packages,
        PathLookup::new(dir.path(), Vec::new()),
    );

    let graph = resolver
        .build_dependency_graph(&dir.path().join("main.py"))
        .unwrap();

    assert!(graph.is_problem_free());
    assert_eq!(graph.len(), 3);
    let mut names: Vec<_> = graph
        .installed_packages()
        .filter_map(|c| c.package())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["PyYAML", "requests"]);
    assert!(graph
        .installed_packages()
        .all(|c| c.references().is_empty() && c.kind() == ContainerKind::InstalledPackage));
}

#[test]
fn editable_install_is_resolved_as_local_code() {
    let dir = TempDir::new().unwrap();
    let checkout = dir.path().join("checkout");
    write(dir.path(), "main.py", "import mylib.core\n");
    write(dir.path(), "checkout/mylib/__init__.py", "");
    write(dir.path(), "checkout/mylib/core.py", "import missing_dep\n");
    write(dir.path(), "site/mylib-0.1.dist-info/top_level.txt", "mylib\n");
    write(
        dir.path(),
        "site/mylib-0.1.dist-info/direct_url.json",
        &format!(
            r#"{{"url": "file://{}", "dir_info": {{"editable": true}}}}"#,
            checkout.display()
        ),
    );
    let resolver = DependencyResolver::standard(
        Whitelist::default(),
        SitePackages::parse(&dir.path().join("site")).unwrap(),
        PathLookup::new(dir.path(), Vec::new()),
    );

    let graph = resolver
        .build_dependency_graph(&dir.path().join("main.py"))
        .unwrap();

    assert_eq!(graph.len(), 2);
    assert_eq!(graph.installed_packages().count(), 0);
    assert_eq!(graph.problems().len(), 1);
    assert_eq!(graph.problems()[0].code, ProblemCode::ReferenceNotFound);
}

#[test]
fn configuration_drives_search_path_and_whitelist() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "project/main.py",
        "import databricks.sdk\nimport shared_util\n",
    );
    write(dir.path(), "vendor/shared_util.py", "");
    write(
        dir.path(),
        CONFIG_FILE_NAME,
        "working-dir: project\nsearch-path: [vendor]\ninherit-pythonpath: false\nwhitelist: [databricks.sdk]\n",
    );

    let config_path = depwalk::find_config(&dir.path().join("project")).unwrap();
    let config = ResolverConfig::load(&config_path).unwrap();
    let resolver = DependencyResolver::from_config(&config).unwrap();

    let graph = resolver
        .build_dependency_graph(&dir.path().join("project/main.py"))
        .unwrap();

    assert!(graph.is_problem_free(), "{:?}", graph.problems());
    assert_eq!(graph.len(), 2);
    assert!(graph.whitelisted_names().contains("databricks.sdk"));
    assert!(graph.all_relative_names().contains("main.py"));
}

#[test]
fn missing_site_packages_directory_fails_configuration() {
    let dir = TempDir::new().unwrap();
    let config = ResolverConfig {
        working_dir: Some(dir.path().to_path_buf()),
        site_packages: vec![dir.path().join("no-such-venv")],
        ..ResolverConfig::default()
    };

    assert!(DependencyResolver::from_config(&config).is_err());
}
