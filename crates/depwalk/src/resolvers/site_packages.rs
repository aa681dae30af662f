//! Resolver for installed packages.

use std::path::PathBuf;

use tracing::trace;

use super::{ReferenceResolver, Resolution, ResolveContext};
use crate::error::{Problem, ProblemCode};
use crate::loader::{PackageLoader, loader_for};
use crate::path_lookup::find_module;
use crate::site_packages::SitePackages;
use crate::types::Reference;

/// Claims absolute imports whose top-level name an installed package provides.
///
/// Regular packages resolve to an opaque stub. Editable installs point at a
/// local source tree, so the module is located there and loaded like local
/// code.
#[derive(Debug, Clone, Default)]
pub struct SitePackageResolver {
    packages: SitePackages,
}

impl SitePackageResolver {
    /// Create a resolver over an installed-package catalog.
    #[must_use]
    pub fn new(packages: SitePackages) -> Self {
        Self { packages }
    }
}

impl ReferenceResolver for SitePackageResolver {
    fn name(&self) -> &'static str {
        "site-packages"
    }

    fn resolve(&self, reference: &Reference, ctx: &mut ResolveContext<'_>) -> Resolution {
        let Some(name) = reference.absolute_import_name() else {
            return Resolution::NotMine;
        };
        let top_level = name.split('.').next().unwrap_or(name);
        let Some(package) = self.packages.get(top_level) else {
            return Resolution::NotMine;
        };

        if package.editable_root().is_none() {
            trace!(module = %name, package = %package.name(), "Resolved installed package");
            return ctx.load(&PackageLoader, package.metadata_dir(), reference);
        }

        let dirs = package.editable_search_dirs();
        match find_module(dirs.iter().map(PathBuf::as_path), name) {
            Some(path) => {
                trace!(module = %name, path = %path.display(), "Resolved editable install");
                ctx.load(loader_for(&path), &path, reference)
            }
            None => Resolution::Problem(
                Problem::new(
                    ProblemCode::ReferenceNotFound,
                    ctx.container.path(),
                    format!(
                        "module {name} not found in editable install of {}",
                        package.name()
                    ),
                )
                .at(reference.location),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoaderCache;
    use crate::path_lookup::PathLookup;
    use crate::resolvers::Dependency;
    use crate::resolvers::test_support::{container, write};
    use crate::site_packages::SitePackage;
    use crate::types::{ContainerKind, ReferenceKind};
    use std::fs;
    use tempfile::TempDir;

    fn import(name: &str) -> Reference {
        Reference::new(
            ReferenceKind::Import {
                name: name.to_string(),
                level: 0,
            },
            None,
            format!("import {name}"),
        )
    }

    fn resolve(resolver: &SitePackageResolver, root: &std::path::Path, name: &str) -> Resolution {
        let main = write(root, "main.py", "x = 1\n");
        let mut cache = LoaderCache::new().unwrap();
        let source = container(&main, &mut cache);
        let lookup = PathLookup::new(root, Vec::new());
        let mut ctx = ResolveContext {
            container: &source,
            lookup: &lookup,
            cache: &mut cache,
        };
        resolver.resolve(&import(name), &mut ctx)
    }

    #[test]
    fn installed_package_resolves_to_stub() {
        let dir = TempDir::new().unwrap();
        let meta = dir.path().join("site/PyYAML-6.0.1.dist-info");
        fs::create_dir_all(&meta).unwrap();
        let resolver = SitePackageResolver::new(SitePackages::from_packages(vec![
            SitePackage::new("PyYAML", meta, vec!["yaml".to_string()]),
        ]));

        let Resolution::Resolved(Dependency::Container(stub)) =
            resolve(&resolver, dir.path(), "yaml.loader")
        else {
            panic!("expected package stub");
        };

        assert_eq!(stub.kind(), ContainerKind::InstalledPackage);
        assert_eq!(stub.package(), Some("PyYAML"));
    }

    #[test]
    fn editable_install_loads_local_source() {
        let dir = TempDir::new().unwrap();
        let meta = dir.path().join("site/mylib-0.1.dist-info");
        fs::create_dir_all(&meta).unwrap();
        write(dir.path(), "checkout/src/mylib/__init__.py", "import json\n");
        let resolver = SitePackageResolver::new(SitePackages::from_packages(vec![
            SitePackage::new("mylib", meta, vec!["mylib".to_string()])
                .with_editable_root(dir.path().join("checkout")),
        ]));

        let Resolution::Resolved(Dependency::Container(module)) =
            resolve(&resolver, dir.path(), "mylib")
        else {
            panic!("expected local module");
        };

        assert_eq!(module.kind(), ContainerKind::File);
        assert!(module.path().ends_with("src/mylib/__init__.py"));
    }

    #[test]
    fn editable_install_missing_module_is_problem() {
        let dir = TempDir::new().unwrap();
        let meta = dir.path().join("site/mylib-0.1.dist-info");
        fs::create_dir_all(&meta).unwrap();
        let resolver = SitePackageResolver::new(SitePackages::from_packages(vec![
            SitePackage::new("mylib", meta, vec!["mylib".to_string()])
                .with_editable_root(dir.path().join("checkout")),
        ]));

        let resolution = resolve(&resolver, dir.path(), "mylib.missing");

        assert!(matches!(
            resolution,
            Resolution::Problem(Problem {
                code: ProblemCode::ReferenceNotFound,
                ..
            })
        ));
    }

    #[test]
    fn unknown_top_level_is_not_mine() {
        let dir = TempDir::new().unwrap();
        let resolver = SitePackageResolver::default();

        assert!(matches!(
            resolve(&resolver, dir.path(), "requests"),
            Resolution::NotMine
        ));
    }
}
