//! Resolver for notebook run directives.

use tracing::trace;

use super::{ReferenceResolver, Resolution, ResolveContext};
use crate::error::{Problem, ProblemCode};
use crate::loader::NotebookLoader;
use crate::types::{Reference, ReferenceKind};

/// Claims `%run` directives and `dbutils.notebook.run` calls.
///
/// Targets are looked up next to the referencing container first, then on
/// the general search path, and must load as notebooks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotebookResolver;

impl ReferenceResolver for NotebookResolver {
    fn name(&self) -> &'static str {
        "notebook"
    }

    fn resolve(&self, reference: &Reference, ctx: &mut ResolveContext<'_>) -> Resolution {
        let path = match &reference.kind {
            ReferenceKind::RunDirective { path } | ReferenceKind::NotebookRun { path } => path,
            _ => return Resolution::NotMine,
        };

        let Some(target) = ctx.lookup.resolve_notebook(path) else {
            return Resolution::Problem(
                Problem::new(
                    ProblemCode::NotebookNotFound,
                    ctx.container.path(),
                    format!("notebook not found: {path}"),
                )
                .at(reference.location),
            );
        };

        trace!(reference = %path, target = %target.display(), "Resolved notebook");
        ctx.load(&NotebookLoader, &target, reference)
    }
}
