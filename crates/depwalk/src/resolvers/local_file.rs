//! Resolver for local modules.

use std::path::{Path, PathBuf};

use tracing::trace;

use super::{ReferenceResolver, Resolution, ResolveContext};
use crate::error::{Problem, ProblemCode};
use crate::loader::loader_for;
use crate::path_lookup::find_module;
use crate::types::{Reference, ReferenceKind};

const PACKAGE_INIT: &str = "__init__.py";

/// Claims every import not handled earlier in the chain.
///
/// Absolute imports are searched on the branch's path lookup. Relative
/// imports start at the container's directory, walked up one level per
/// extra leading dot. The target is loaded as a notebook when it carries a
/// notebook header.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileResolver;

impl LocalFileResolver {
    fn locate(name: &str, level: u32, ctx: &ResolveContext<'_>) -> Option<PathBuf> {
        if level == 0 {
            return ctx.lookup.resolve_module(name);
        }

        let base = ctx
            .container
            .parent_dir()?
            .ancestors()
            .nth(level as usize - 1)?;
        if name.is_empty() {
            return package_init(base);
        }
        // `from . import name` may name an attribute of the package itself.
        find_module([base], name).or_else(|| {
            if name.contains('.') {
                None
            } else {
                package_init(base)
            }
        })
    }
}

impl ReferenceResolver for LocalFileResolver {
    fn name(&self) -> &'static str {
        "local-file"
    }

    fn resolve(&self, reference: &Reference, ctx: &mut ResolveContext<'_>) -> Resolution {
        let ReferenceKind::Import { name, level } = &reference.kind else {
            return Resolution::NotMine;
        };

        match Self::locate(name, *level, ctx) {
            Some(path) => {
                trace!(module = %reference.display_name(), path = %path.display(), "Resolved local module");
                ctx.load(loader_for(&path), &path, reference)
            }
            None => Resolution::Problem(
                Problem::new(
                    ProblemCode::ReferenceNotFound,
                    ctx.container.path(),
                    format!("could not locate import: {}", reference.display_name()),
                )
                .at(reference.location),
            ),
        }
    }
}

fn package_init(dir: &Path) -> Option<PathBuf> {
    let init = dir.join(PACKAGE_INIT);
    init.is_file().then(|| init.canonicalize().ok()).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoaderCache;
    use crate::path_lookup::PathLookup;
    use crate::resolvers::test_support::{container, write};
    use crate::types::ContainerKind;
    use rstest::rstest;
    use tempfile::TempDir;

    fn resolve(from: &Path, root: &Path, name: &str, level: u32) -> Resolution {
        let mut cache = LoaderCache::new().unwrap();
        let source = container(from, &mut cache);
        let lookup = PathLookup::new(root, Vec::new())
            .branch_into(source.parent_dir().unwrap());
        let mut ctx = ResolveContext {
            container: &source,
            lookup: &lookup,
            cache: &mut cache,
        };
        let reference = Reference::new(
            ReferenceKind::Import {
                name: name.to_string(),
                level,
            },
            None,
            "",
        );
        LocalFileResolver.resolve(&reference, &mut ctx)
    }

    fn resolved_path(resolution: Resolution) -> PathBuf {
        match resolution {
            Resolution::Resolved(dep) => dep.container().unwrap().path().to_path_buf(),
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[rstest]
    #[case::sibling_module("util", 1, "pkg/util.py")]
    #[case::package_attribute("helper", 1, "pkg/__init__.py")]
    #[case::parent_package("top", 2, "top.py")]
    #[case::bare_dots("", 1, "pkg/__init__.py")]
    fn relative_imports(
        #[case] name: &str,
        #[case] level: u32,
        #[case] expected: &str,
    ) {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/__init__.py", "");
        write(dir.path(), "pkg/util.py", "");
        write(dir.path(), "top.py", "");
        let from = write(dir.path(), "pkg/main.py", "");

        let path = resolved_path(resolve(&from, dir.path(), name, level));

        assert_eq!(path, dir.path().join(expected).canonicalize().unwrap());
    }

    #[test]
    fn absolute_import_searches_container_dir_first() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "lib/mod/__init__.py", "");
        let from = write(dir.path(), "lib/main.py", "");

        let path = resolved_path(resolve(&from, dir.path(), "mod", 0));

        assert!(path.ends_with("lib/mod/__init__.py"));
    }

    #[test]
    fn notebook_target_loads_as_notebook() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "nb_lib.py", "# Databricks notebook source\nx = 1\n");
        let from = write(dir.path(), "main.py", "");

        let Resolution::Resolved(dep) = resolve(&from, dir.path(), "nb_lib", 0) else {
            panic!("expected resolution");
        };

        assert_eq!(dep.container().unwrap().kind(), ContainerKind::Notebook);
    }

    #[test]
    fn missing_module_names_the_reference() {
        let dir = TempDir::new().unwrap();
        let from = write(dir.path(), "main.py", "");

        let Resolution::Problem(problem) = resolve(&from, dir.path(), "nowhere.deep", 0) else {
            panic!("expected problem");
        };

        assert_eq!(problem.code, ProblemCode::ReferenceNotFound);
        assert!(problem.message.contains("nowhere.deep"));
    }

    #[test]
    fn dotted_relative_miss_does_not_fall_back_to_init() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pkg/__init__.py", "");
        let from = write(dir.path(), "pkg/main.py", "");

        assert!(matches!(
            resolve(&from, dir.path(), "sub.mod", 1),
            Resolution::Problem(_)
        ));
    }
}
