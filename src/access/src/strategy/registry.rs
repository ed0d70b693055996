/// Strategy registry with binding cache
///
/// Caches resolved strategy instances by binding name, so two configurations
/// naming the same binding share one instance.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{AccessLimitsStrategy, StrategyProvider};
use crate::error::Result;
use crate::limits::AccessLimits;
use crate::rules::StrategyConfig;
use crate::types::{CatalogMode, Principal, Resource, StrategyOptions};

/// Strategy instance paired with the options of one configuration
#[derive(Clone)]
pub struct BoundStrategy {
    binding_name: String,
    strategy: Arc<dyn AccessLimitsStrategy>,
    options: StrategyOptions,
}

impl BoundStrategy {
    pub fn new(
        binding_name: impl Into<String>,
        strategy: Arc<dyn AccessLimitsStrategy>,
        options: StrategyOptions,
    ) -> Self {
        Self {
            binding_name: binding_name.into(),
            strategy,
            options,
        }
    }

    pub fn binding_name(&self) -> &str {
        &self.binding_name
    }

    pub fn options(&self) -> &StrategyOptions {
        &self.options
    }

    pub async fn build_access_limits(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
        catalog_mode: CatalogMode,
    ) -> Result<AccessLimits> {
        self.strategy
            .build_access_limits(principal, resource, catalog_mode, &self.options)
            .await
    }

    pub async fn security_token(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
    ) -> Result<String> {
        self.strategy
            .security_token(principal, resource, &self.options)
            .await
    }
}

impl std::fmt::Debug for BoundStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundStrategy")
            .field("binding_name", &self.binding_name)
            .field("options", &self.options)
            .finish()
    }
}

/// Resolves and caches strategies by binding name
pub struct StrategyRegistry {
    provider: Arc<dyn StrategyProvider>,
    bound: DashMap<String, Arc<dyn AccessLimitsStrategy>>,
    lookups: AtomicUsize,
}

impl StrategyRegistry {
    pub fn new(provider: Arc<dyn StrategyProvider>) -> Self {
        Self {
            provider,
            bound: DashMap::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Strategy bound to `binding_name`, resolving it on first use
    ///
    /// # Errors
    ///
    /// * `BindingNotFound` - the provider does not know the name
    pub fn get_strategy(&self, binding_name: &str) -> Result<Arc<dyn AccessLimitsStrategy>> {
        if let Some(strategy) = self.bound.get(binding_name) {
            return Ok(strategy.value().clone());
        }

        debug!("Resolving strategy binding {}", binding_name);
        let strategy = self.provider.resolve_binding(binding_name)?;
        self.lookups.fetch_add(1, Ordering::Relaxed);

        // A concurrent miss may have bound it first; keep that instance
        let strategy = self
            .bound
            .entry(binding_name.to_string())
            .or_insert(strategy)
            .value()
            .clone();

        Ok(strategy)
    }

    /// Strategy for `config`, carrying the config's options
    pub fn bind(&self, config: &StrategyConfig) -> Result<BoundStrategy> {
        let strategy = self.get_strategy(&config.binding_name)?;
        Ok(BoundStrategy::new(
            config.binding_name.clone(),
            strategy,
            config.options.clone(),
        ))
    }

    /// Number of bindings resolved through the provider
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    pub fn bound_count(&self) -> usize {
        self.bound.len()
    }
}
