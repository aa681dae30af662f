//! Resolver for allow-listed modules.

use super::{Dependency, ReferenceResolver, Resolution, ResolveContext};
use crate::types::Reference;
use crate::whitelist::Whitelist;

/// Claims absolute imports of allow-listed modules as leaves.
#[derive(Debug, Clone, Default)]
pub struct WhitelistResolver {
    whitelist: Whitelist,
}

impl WhitelistResolver {
    /// Create a resolver over `whitelist`.
    #[must_use]
    pub fn new(whitelist: Whitelist) -> Self {
        Self { whitelist }
    }
}

impl ReferenceResolver for WhitelistResolver {
    fn name(&self) -> &'static str {
        "whitelist"
    }

    fn resolve(&self, reference: &Reference, _ctx: &mut ResolveContext<'_>) -> Resolution {
        reference
            .absolute_import_name()
            .and_then(|name| self.whitelist.matches(name))
            .map_or(Resolution::NotMine, |entry| {
                Resolution::Resolved(Dependency::Whitelisted(entry.to_string()))
            })
    }
}
