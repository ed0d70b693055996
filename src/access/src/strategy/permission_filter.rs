//! Strategy deriving filters from permission tokens

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error};

use super::{digest_token, AccessLimitsStrategy};
use crate::error::Result;
use crate::limits::AccessLimits;
use crate::permissions::PermissionCache;
use crate::predicate::{compile_predicate, Predicate, DEFAULT_FILTER_TEMPLATE};
use crate::roi::{MaskSpec, RoiBuilder};
use crate::types::{CatalogMode, Principal, Resource, ResourceKind, StrategyOptions};

/// Filter template applied to the principal's tokens
pub const FILTER_TEMPLATE_OPTION: &str = "filter_template";

/// Older name of [`FILTER_TEMPLATE_OPTION`], still accepted
pub const CQL_FILTER_TEMPLATE_OPTION: &str = "cql_filter_template";

/// Vector layer (`ns:name` or `name`) delimiting raster access
pub const MASK_LAYER_OPTION: &str = "raster_mask_layer";

/// Template selecting the mask layer's features
pub const MASK_FILTER_TEMPLATE_OPTION: &str = "raster_mask_filter_template";

/// Filters data by the principal's permission tokens
///
/// Vector resources get the same predicate for reading and writing. Raster
/// resources are additionally clipped to a mask when `raster_mask_layer` is
/// set. Any failure to obtain tokens denies access.
pub struct PermissionFilterStrategy {
    permissions: Arc<PermissionCache>,
    roi: Arc<RoiBuilder>,
}

impl PermissionFilterStrategy {
    pub fn new(permissions: Arc<PermissionCache>, roi: Arc<RoiBuilder>) -> Self {
        Self { permissions, roi }
    }

    /// Predicate over the principal's tokens, `EXCLUDE` on any failure
    pub async fn access_predicate(
        &self,
        principal: Option<&Principal>,
        options: &StrategyOptions,
    ) -> Predicate {
        let tokens = match self.permissions.get_permissions(principal).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Could not retrieve user permissions, denying access: {}", e);
                return Predicate::Exclude;
            }
        };

        let predicate = compile_predicate(filter_template(options), &tokens);
        debug!(
            "Access filter for {}: {}",
            principal.map_or("anonymous", |p| p.name.as_str()),
            predicate
        );
        predicate
    }
}

fn option<'a>(options: &'a StrategyOptions, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn filter_template(options: &StrategyOptions) -> &str {
    option(options, FILTER_TEMPLATE_OPTION)
        .or_else(|| option(options, CQL_FILTER_TEMPLATE_OPTION))
        .unwrap_or(DEFAULT_FILTER_TEMPLATE)
}

/// Mask configuration; the mask template falls back to the read/write template
fn mask_spec(options: &StrategyOptions) -> Option<MaskSpec> {
    let layer = option(options, MASK_LAYER_OPTION)?;
    let template =
        option(options, MASK_FILTER_TEMPLATE_OPTION).unwrap_or_else(|| filter_template(options));
    Some(MaskSpec::new(layer, template))
}

#[async_trait]
impl AccessLimitsStrategy for PermissionFilterStrategy {
    async fn build_access_limits(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
        catalog_mode: CatalogMode,
        options: &StrategyOptions,
    ) -> Result<AccessLimits> {
        let filter = self.access_predicate(principal, options).await;

        let roi = match resource.kind {
            ResourceKind::Coverage | ResourceKind::TiledService => {
                let mask = mask_spec(options);
                self.roi
                    .build_roi(principal, resource, mask.as_ref())
                    .await?
            }
            _ => None,
        };

        AccessLimits::for_kind(&resource.kind, catalog_mode, filter.clone(), filter, roi)
    }

    async fn security_token(
        &self,
        principal: Option<&Principal>,
        _resource: &Resource,
        options: &StrategyOptions,
    ) -> Result<String> {
        let filter = self.access_predicate(principal, options).await;
        Ok(digest_token(&filter.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_defaults() {
        let mut options = StrategyOptions::new();
        assert_eq!(filter_template(&options), DEFAULT_FILTER_TEMPLATE);
        assert!(mask_spec(&options).is_none());

        options.insert(FILTER_TEMPLATE_OPTION.to_string(), "svc IN ({0})".to_string());
        options.insert(MASK_LAYER_OPTION.to_string(), "topp:areas".to_string());
        assert_eq!(filter_template(&options), "svc IN ({0})");

        let mask = mask_spec(&options).unwrap();
        assert_eq!(mask.layer, "topp:areas");
        assert_eq!(mask.filter_template, "svc IN ({0})");

        options.insert(
            MASK_FILTER_TEMPLATE_OPTION.to_string(),
            "area_id IN ({0})".to_string(),
        );
        assert_eq!(mask_spec(&options).unwrap().filter_template, "area_id IN ({0})");
    }

    #[test]
    fn test_cql_template_key_is_accepted() {
        let mut options = StrategyOptions::new();
        options.insert(
            CQL_FILTER_TEMPLATE_OPTION.to_string(),
            "layer_id IN ({0})".to_string(),
        );
        assert_eq!(filter_template(&options), "layer_id IN ({0})");
        options.insert(MASK_LAYER_OPTION.to_string(), "areas".to_string());
        assert_eq!(mask_spec(&options).unwrap().filter_template, "layer_id IN ({0})");

        // The current key wins when both are set
        options.insert(FILTER_TEMPLATE_OPTION.to_string(), "svc IN ({0})".to_string());
        assert_eq!(filter_template(&options), "svc IN ({0})");
    }

    #[test]
    fn test_blank_options_are_ignored() {
        let mut options = StrategyOptions::new();
        options.insert(FILTER_TEMPLATE_OPTION.to_string(), "  ".to_string());
        options.insert(MASK_LAYER_OPTION.to_string(), String::new());

        assert_eq!(filter_template(&options), DEFAULT_FILTER_TEMPLATE);
        assert!(mask_spec(&options).is_none());
    }
}
