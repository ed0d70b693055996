//! Access-limits resolution engine
//!
//! Ties the rule table, strategy registry, permission cache and ROI builder
//! together behind the host-facing operations.

pub mod metrics;

pub use metrics::{EngineMetrics, MetricsCollector};

use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::CacheConfig;
use crate::error::{AccessError, Result};
use crate::limits::{AccessLimits, WorkspaceAccessLimits};
use crate::permissions::{PermissionCache, PermissionSource};
use crate::roi::{Catalog, Reprojector, RoiBuilder};
use crate::rules::{read_configuration, RuleTable};
use crate::strategy::{
    AccessLimitsStrategy, LayeredStrategyProvider, ReadWriteStrategy, StaticStrategyProvider,
    StrategyProvider, StrategyRegistry,
};
use crate::types::{Principal, Resource, ResourceKind};

/// Role granting the administrator override under [`RoleAuthority`]
pub const DEFAULT_ADMIN_ROLE: &str = "ROLE_ADMINISTRATOR";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Enable metrics collection
    pub enable_metrics: bool,

    /// Permission-token cache
    pub permission_cache: CacheConfig,

    /// ROI geometry cache
    pub roi_cache: CacheConfig,

    /// Role checked by the default administrator authority
    pub admin_role: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            permission_cache: CacheConfig::default(),
            roi_cache: CacheConfig::default(),
            admin_role: DEFAULT_ADMIN_ROLE.to_string(),
        }
    }
}

/// Decides whether a principal is an administrator
pub trait AdminAuthority: Send + Sync {
    fn is_administrator(&self, principal: &Principal) -> bool;
}

/// Administrator = holder of one configured role
#[derive(Debug, Clone)]
pub struct RoleAuthority {
    role: String,
}

impl RoleAuthority {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

impl AdminAuthority for RoleAuthority {
    fn is_administrator(&self, principal: &Principal) -> bool {
        principal.has_role(&self.role)
    }
}

/// Access-limits engine
///
/// # Architecture
///
/// ```text
/// (principal, resource) → admin? ──yes──→ full access
///                           │no
///                           ↓
///                       RuleTable → StrategyRegistry → strategy
///                                                        ↓
///                                  PermissionCache → predicate (+ RoiBuilder)
///                                                        ↓
///                                                  AccessLimits
/// ```
///
/// The active rule table is an immutable snapshot; a reload publishes a new
/// snapshot atomically.
pub struct AccessEngine {
    table: RwLock<Arc<RuleTable>>,
    registry: StrategyRegistry,
    admin_strategy: Arc<dyn AccessLimitsStrategy>,
    authority: Arc<dyn AdminAuthority>,
    permissions: Arc<PermissionCache>,
    roi: Arc<RoiBuilder>,
    metrics: Option<Arc<MetricsCollector>>,
    config: EngineConfig,
}

impl AccessEngine {
    /// Start building an engine around the host collaborators
    pub fn builder(
        permission_source: Arc<dyn PermissionSource>,
        catalog: Arc<dyn Catalog>,
        reprojector: Arc<dyn Reprojector>,
    ) -> AccessEngineBuilder {
        AccessEngineBuilder {
            config: EngineConfig::default(),
            table: RuleTable::new(),
            permission_source,
            catalog,
            reprojector,
            authority: None,
            provider: None,
            strategies: Vec::new(),
        }
    }

    /// Access limits of `principal` on `resource`
    ///
    /// Administrators always get full access. Everyone else gets whatever
    /// the strategy matched by the rule table builds.
    ///
    /// # Errors
    ///
    /// * `UnsupportedResourceKind` - not a vector, coverage or tiled service
    /// * `InvalidArgument` / `InvalidConfiguration` - from rule resolution
    /// * `BindingNotFound` - the matched strategy is not registered
    /// * `MaskLayerNotFound` / `MaskLayerNotVector` / `ReprojectionFailed`
    pub async fn get_access_limits(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
    ) -> Result<AccessLimits> {
        let start = Instant::now();

        debug!(
            "Access limits request: principal={}, resource={}",
            principal.map_or("anonymous", |p| p.name.as_str()),
            resource.qualified_name()
        );

        let admin = self.is_administrator(principal);
        let result = self.resolve_limits(principal, resource, admin).await;

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(limits) => metrics.record_request(admin, limits.denies_read()).await,
                Err(_) => metrics.record_error().await,
            }
            metrics.record_latency(start.elapsed()).await;
        }

        result
    }

    /// Cache-partitioning token for `principal`'s access to `resource`
    pub async fn get_security_token(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
    ) -> Result<String> {
        if let Some(metrics) = &self.metrics {
            metrics.record_token_request().await;
        }

        if let ResourceKind::Other(kind) = &resource.kind {
            return Err(AccessError::UnsupportedResourceKind(kind.clone()));
        }

        if self.is_administrator(principal) {
            return self
                .admin_strategy
                .security_token(principal, resource, &Default::default())
                .await;
        }

        let table = self.rule_table();
        let config = table.resolve(&resource.workspace, &resource.name)?;
        let bound = self.registry.bind(config)?;
        bound.security_token(principal, resource).await
    }

    /// Rights on a whole workspace: full for administrators, read-only otherwise
    pub fn get_workspace_access_limits(
        &self,
        principal: Option<&Principal>,
        workspace: &str,
    ) -> Result<WorkspaceAccessLimits> {
        if workspace.trim().is_empty() {
            return Err(AccessError::InvalidArgument(
                "workspace must be specified".to_string(),
            ));
        }

        let catalog_mode = self.rule_table().catalog_mode();
        if self.is_administrator(principal) {
            debug!("Admin level access, full rights on workspace {}", workspace);
            return Ok(WorkspaceAccessLimits::full(catalog_mode));
        }

        Ok(WorkspaceAccessLimits::read_only(catalog_mode))
    }

    /// Publish a new rule table
    ///
    /// An invalid table is rejected and the current one stays in effect.
    pub async fn reload_configuration(&self, table: RuleTable) -> Result<()> {
        if !table.is_valid() {
            warn!("Rejecting invalid configuration, keeping the current one");
            if let Some(metrics) = &self.metrics {
                metrics.record_reload(false).await;
            }
            return Err(AccessError::InvalidConfiguration(
                "new configuration is not valid".to_string(),
            ));
        }

        info!(
            "Reloading configuration: {} strategies, {} rules",
            table.strategies().len(),
            table.rules().len()
        );
        *self.table.write() = Arc::new(table);

        if let Some(metrics) = &self.metrics {
            metrics.record_reload(true).await;
        }
        Ok(())
    }

    /// Read a configuration file and publish it
    pub async fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let table = match read_configuration(path) {
            Ok(table) => table,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_reload(false).await;
                }
                return Err(e);
            }
        };
        self.reload_configuration(table).await
    }

    /// Snapshot of the active rule table
    pub fn rule_table(&self) -> Arc<RuleTable> {
        self.table.read().clone()
    }

    pub fn evict_permission_cache(&self, key: &str) -> bool {
        self.permissions.evict(key)
    }

    pub fn evict_all_permission_cache(&self) -> bool {
        self.permissions.evict_all()
    }

    pub fn evict_roi_cache(&self, key: &str) -> bool {
        self.roi.evict(key)
    }

    pub fn evict_all_roi_cache(&self) -> bool {
        self.roi.evict_all()
    }

    /// Calls made to the permission source
    pub fn permission_fetch_count(&self) -> usize {
        self.permissions.fetch_count()
    }

    /// Strategy bindings resolved through the provider
    pub fn strategy_lookup_count(&self) -> usize {
        self.registry.lookup_count()
    }

    pub async fn metrics(&self) -> Option<EngineMetrics> {
        match &self.metrics {
            Some(metrics) => Some(metrics.get_metrics().await),
            None => None,
        }
    }

    pub async fn export_prometheus(&self) -> Option<String> {
        match &self.metrics {
            Some(metrics) => Some(metrics.export_prometheus().await),
            None => None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn is_administrator(&self, principal: Option<&Principal>) -> bool {
        principal.map_or(false, |p| self.authority.is_administrator(p))
    }

    async fn resolve_limits(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
        admin: bool,
    ) -> Result<AccessLimits> {
        if let ResourceKind::Other(kind) = &resource.kind {
            return Err(AccessError::UnsupportedResourceKind(kind.clone()));
        }

        let table = self.rule_table();

        if admin {
            debug!("Admin level access on {}", resource.qualified_name());
            return AccessLimits::full_access(&resource.kind, table.catalog_mode());
        }

        let config = table.resolve(&resource.workspace, &resource.name)?;
        debug!(
            "Access limits for {} computed by {}",
            resource.qualified_name(),
            config
        );

        let bound = self.registry.bind(config)?;
        bound
            .build_access_limits(principal, resource, table.catalog_mode())
            .await
    }
}

/// Builder for [`AccessEngine`]
pub struct AccessEngineBuilder {
    config: EngineConfig,
    table: RuleTable,
    permission_source: Arc<dyn PermissionSource>,
    catalog: Arc<dyn Catalog>,
    reprojector: Arc<dyn Reprojector>,
    authority: Option<Arc<dyn AdminAuthority>>,
    provider: Option<Arc<dyn StrategyProvider>>,
    strategies: Vec<(String, Arc<dyn AccessLimitsStrategy>)>,
}

impl AccessEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rule_table(mut self, table: RuleTable) -> Self {
        self.table = table;
        self
    }

    /// Replace the role-based administrator check
    pub fn authority(mut self, authority: Arc<dyn AdminAuthority>) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Replace the built-in strategy provider
    ///
    /// Strategies registered with [`strategy`](Self::strategy) still take
    /// priority over the provider's own bindings.
    pub fn provider(mut self, provider: Arc<dyn StrategyProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register a strategy next to the built-ins or the custom provider
    pub fn strategy(
        mut self,
        binding_name: impl Into<String>,
        strategy: Arc<dyn AccessLimitsStrategy>,
    ) -> Self {
        self.strategies.push((binding_name.into(), strategy));
        self
    }

    /// # Errors
    ///
    /// * `InvalidConfiguration` - the initial rule table is not valid
    pub fn build(self) -> Result<AccessEngine> {
        if !self.table.is_valid() {
            return Err(AccessError::InvalidConfiguration(
                "initial configuration is not valid".to_string(),
            ));
        }

        let permissions = Arc::new(PermissionCache::new(
            self.permission_source,
            self.config.permission_cache.clone(),
        ));
        let roi = Arc::new(RoiBuilder::new(
            self.catalog,
            self.reprojector,
            permissions.clone(),
            self.config.roi_cache.clone(),
        ));

        let provider = match self.provider {
            Some(provider) if self.strategies.is_empty() => provider,
            Some(provider) => {
                let overrides = self
                    .strategies
                    .into_iter()
                    .fold(StaticStrategyProvider::new(), |overrides, (name, strategy)| {
                        overrides.with_strategy(name, strategy)
                    });
                Arc::new(LayeredStrategyProvider::new(overrides, provider))
                    as Arc<dyn StrategyProvider>
            }
            None => {
                let provider = self.strategies.into_iter().fold(
                    StaticStrategyProvider::with_builtins(permissions.clone(), roi.clone()),
                    |provider, (name, strategy)| provider.with_strategy(name, strategy),
                );
                Arc::new(provider) as Arc<dyn StrategyProvider>
            }
        };

        let authority = match self.authority {
            Some(authority) => authority,
            None => Arc::new(RoleAuthority::new(self.config.admin_role.clone()))
                as Arc<dyn AdminAuthority>,
        };

        let metrics = if self.config.enable_metrics {
            Some(Arc::new(MetricsCollector::new()))
        } else {
            None
        };

        info!(
            "AccessEngine initialized with {} rules, metrics={}",
            self.table.rules().len(),
            self.config.enable_metrics
        );

        Ok(AccessEngine {
            table: RwLock::new(Arc::new(self.table)),
            registry: StrategyRegistry::new(provider),
            admin_strategy: Arc::new(ReadWriteStrategy::allow_all()),
            authority,
            permissions,
            roi,
            metrics,
            config: self.config,
        })
    }
}
