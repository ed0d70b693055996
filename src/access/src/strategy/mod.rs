/// Access-limits strategies
///
/// A strategy turns `(principal, resource)` into [`AccessLimits`]. Strategies
/// are looked up by binding name through a [`StrategyProvider`] and cached by
/// the [`StrategyRegistry`]. Options travel with every call instead of
/// living on the shared instance.
///
/// Built-in bindings:
///
/// * `allow-all` - read and write everything
/// * `read-only` - read everything, write nothing
/// * `deny-all` - nothing
/// * `permission-filter` - filters derived from the principal's permission tokens

mod permission_filter;
mod read_write;
mod registry;

pub use permission_filter::{
    PermissionFilterStrategy, CQL_FILTER_TEMPLATE_OPTION, FILTER_TEMPLATE_OPTION,
    MASK_FILTER_TEMPLATE_OPTION, MASK_LAYER_OPTION,
};
pub use read_write::ReadWriteStrategy;
pub use registry::{BoundStrategy, StrategyRegistry};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AccessError, Result};
use crate::limits::AccessLimits;
use crate::permissions::PermissionCache;
use crate::roi::RoiBuilder;
use crate::types::{CatalogMode, Principal, Resource, StrategyOptions};

pub const ALLOW_ALL_BINDING: &str = "allow-all";
pub const READ_ONLY_BINDING: &str = "read-only";
pub const DENY_ALL_BINDING: &str = "deny-all";
pub const PERMISSION_FILTER_BINDING: &str = "permission-filter";

/// Length of security tokens (hex characters)
pub const SECURITY_TOKEN_LENGTH: usize = 32;

/// Pluggable access policy
#[async_trait]
pub trait AccessLimitsStrategy: Send + Sync {
    async fn build_access_limits(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
        catalog_mode: CatalogMode,
        options: &StrategyOptions,
    ) -> Result<AccessLimits>;

    /// Opaque token equal for principals with equal effective access
    async fn security_token(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
        options: &StrategyOptions,
    ) -> Result<String>;
}

/// Resolves binding names to strategy instances
pub trait StrategyProvider: Send + Sync {
    fn resolve_binding(&self, name: &str) -> Result<Arc<dyn AccessLimitsStrategy>>;
}

/// Fixed table of named strategies
#[derive(Default)]
pub struct StaticStrategyProvider {
    strategies: HashMap<String, Arc<dyn AccessLimitsStrategy>>,
}

impl StaticStrategyProvider {
    /// Provider without any bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with the four built-in bindings
    pub fn with_builtins(permissions: Arc<PermissionCache>, roi: Arc<RoiBuilder>) -> Self {
        Self::new()
            .with_strategy(ALLOW_ALL_BINDING, Arc::new(ReadWriteStrategy::allow_all()))
            .with_strategy(READ_ONLY_BINDING, Arc::new(ReadWriteStrategy::read_only()))
            .with_strategy(DENY_ALL_BINDING, Arc::new(ReadWriteStrategy::deny_all()))
            .with_strategy(
                PERMISSION_FILTER_BINDING,
                Arc::new(PermissionFilterStrategy::new(permissions, roi)),
            )
    }

    /// Register (or replace) a binding
    pub fn with_strategy(
        mut self,
        name: impl Into<String>,
        strategy: Arc<dyn AccessLimitsStrategy>,
    ) -> Self {
        self.strategies.insert(name.into(), strategy);
        self
    }

    pub fn binding_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl StrategyProvider for StaticStrategyProvider {
    fn resolve_binding(&self, name: &str) -> Result<Arc<dyn AccessLimitsStrategy>> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| AccessError::BindingNotFound(name.to_string()))
    }
}

/// Named strategies consulted before a fallback provider
pub struct LayeredStrategyProvider {
    overrides: StaticStrategyProvider,
    fallback: Arc<dyn StrategyProvider>,
}

impl LayeredStrategyProvider {
    pub fn new(overrides: StaticStrategyProvider, fallback: Arc<dyn StrategyProvider>) -> Self {
        Self {
            overrides,
            fallback,
        }
    }
}

impl StrategyProvider for LayeredStrategyProvider {
    fn resolve_binding(&self, name: &str) -> Result<Arc<dyn AccessLimitsStrategy>> {
        match self.overrides.strategies.get(name) {
            Some(strategy) => Ok(strategy.clone()),
            None => self.fallback.resolve_binding(name),
        }
    }
}

/// Short hex digest of `text`, used as a security token
pub fn digest_token(text: &str) -> String {
    let hash = blake3::hash(text.as_bytes());
    hash.to_hex().as_str()[..SECURITY_TOKEN_LENGTH].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_token() {
        let a = digest_token("INCLUDE_EXCLUDE");
        assert_eq!(a.len(), SECURITY_TOKEN_LENGTH);
        assert_eq!(a, digest_token("INCLUDE_EXCLUDE"));
        assert_ne!(a, digest_token("INCLUDE_INCLUDE"));
    }

    #[test]
    fn test_static_provider() {
        let provider = StaticStrategyProvider::new()
            .with_strategy(READ_ONLY_BINDING, Arc::new(ReadWriteStrategy::read_only()));

        assert!(provider.resolve_binding(READ_ONLY_BINDING).is_ok());
        assert!(matches!(
            provider.resolve_binding("nope"),
            Err(AccessError::BindingNotFound(_))
        ));
        assert_eq!(provider.binding_names(), vec![READ_ONLY_BINDING]);
    }

    #[tokio::test]
    async fn test_layered_provider_prefers_overrides() {
        let fallback = StaticStrategyProvider::new()
            .with_strategy("shared", Arc::new(ReadWriteStrategy::deny_all()))
            .with_strategy(DENY_ALL_BINDING, Arc::new(ReadWriteStrategy::deny_all()));
        let overrides = StaticStrategyProvider::new()
            .with_strategy("shared", Arc::new(ReadWriteStrategy::allow_all()));
        let provider = LayeredStrategyProvider::new(overrides, Arc::new(fallback));

        let resource = Resource::vector("topp", "states");
        let shared = provider.resolve_binding("shared").unwrap();
        let limits = shared
            .build_access_limits(None, &resource, CatalogMode::Hide, &StrategyOptions::new())
            .await
            .unwrap();
        assert!(limits.read_filter().is_include());

        assert!(provider.resolve_binding(DENY_ALL_BINDING).is_ok());
        assert!(matches!(
            provider.resolve_binding("nope"),
            Err(AccessError::BindingNotFound(_))
        ));
    }
}
