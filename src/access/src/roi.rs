//! Region-of-interest builder
//!
//! A raster resource may be clipped to the area covered by a principal's
//! features in a designated vector "mask" layer. The merged mask geometry is
//! cached per principal in the mask layer's own coordinate system and moved
//! into the requested resource's system on every call.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use geo_types::{Geometry, MultiPolygon, Polygon};
use std::sync::Arc;
use tracing::{debug, error};

use crate::cache::{CacheConfig, EvictableCache, MemoryCache};
use crate::error::{AccessError, Result};
use crate::permissions::PermissionCache;
use crate::predicate::{compile_predicate, Predicate};
use crate::types::{cache_key_for, Crs, Principal, QualifiedName, Resource, ResourceKind};

/// A layer as known to the host catalog
#[derive(Debug, Clone, PartialEq)]
pub struct LayerHandle {
    pub name: QualifiedName,
    pub kind: ResourceKind,
    pub crs: Option<Crs>,
}

impl LayerHandle {
    pub fn new(name: QualifiedName, kind: ResourceKind) -> Self {
        Self {
            name,
            kind,
            crs: None,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }
}

/// Host resource catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_layer(&self, name: &QualifiedName) -> Result<Option<LayerHandle>>;

    /// Geometries of the features of `layer` matching `predicate`
    async fn query_features(
        &self,
        layer: &LayerHandle,
        predicate: &Predicate,
    ) -> Result<BoxStream<'static, Result<Geometry<f64>>>>;
}

/// Coordinate transformation
pub trait Reprojector: Send + Sync {
    fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &Crs,
        to: &Crs,
    ) -> Result<MultiPolygon<f64>>;
}

/// Mask layer and the template selecting its features
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSpec {
    pub layer: String,
    pub filter_template: String,
}

impl MaskSpec {
    pub fn new(layer: impl Into<String>, filter_template: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            filter_template: filter_template.into(),
        }
    }
}

/// Builds (and caches) per-principal ROI geometry
pub struct RoiBuilder {
    catalog: Arc<dyn Catalog>,
    reprojector: Arc<dyn Reprojector>,
    permissions: Arc<PermissionCache>,
    cache: Arc<dyn EvictableCache<MultiPolygon<f64>>>,
}

impl RoiBuilder {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        reprojector: Arc<dyn Reprojector>,
        permissions: Arc<PermissionCache>,
        config: CacheConfig,
    ) -> Self {
        Self::with_cache(
            catalog,
            reprojector,
            permissions,
            Arc::new(MemoryCache::new(config)),
        )
    }

    /// Use an externally provided cache
    pub fn with_cache(
        catalog: Arc<dyn Catalog>,
        reprojector: Arc<dyn Reprojector>,
        permissions: Arc<PermissionCache>,
        cache: Arc<dyn EvictableCache<MultiPolygon<f64>>>,
    ) -> Self {
        Self {
            catalog,
            reprojector,
            permissions,
            cache,
        }
    }

    /// ROI for `principal` on `resource`
    ///
    /// Returns `None` when no mask is configured (unrestricted), otherwise
    /// the mask geometry in the resource's coordinate system. An empty
    /// geometry denies everything.
    ///
    /// # Errors
    ///
    /// * `MaskLayerNotFound` / `MaskLayerNotVector` - bad mask configuration
    /// * `ReprojectionFailed` - the geometry could not be transformed
    pub async fn build_roi(
        &self,
        principal: Option<&Principal>,
        resource: &Resource,
        mask: Option<&MaskSpec>,
    ) -> Result<Option<MultiPolygon<f64>>> {
        let Some(mask) = mask else {
            return Ok(None);
        };

        let layer = self.find_mask_layer(&mask.layer).await?;
        let key = cache_key_for(principal);

        let geometry = match self.cache.get(key) {
            Some(geometry) => {
                debug!("ROI cache hit for {}", key);
                geometry
            }
            None => {
                debug!("ROI cache miss for {}, querying {}", key, layer.name);
                match self.collect_mask(principal, &layer, &mask.filter_template).await {
                    Some(geometry) => {
                        self.cache.put(key, geometry.clone());
                        geometry
                    }
                    None => return Ok(Some(MultiPolygon::new(Vec::new()))),
                }
            }
        };

        self.reproject(geometry, layer.crs.as_ref(), resource.crs.as_ref())
            .map(Some)
    }

    pub fn evict(&self, key: &str) -> bool {
        debug!("Evicting ROI cache entry {}", key);
        self.cache.evict(key)
    }

    pub fn evict_all(&self) -> bool {
        debug!("Evicting all ROI cache entries");
        self.cache.evict_all()
    }

    async fn find_mask_layer(&self, layer_name: &str) -> Result<LayerHandle> {
        let name = QualifiedName::parse(layer_name);
        let layer = self
            .catalog
            .find_layer(&name)
            .await?
            .ok_or_else(|| AccessError::MaskLayerNotFound(layer_name.to_string()))?;

        if layer.kind != ResourceKind::Vector {
            return Err(AccessError::MaskLayerNotVector(layer_name.to_string()));
        }

        Ok(layer)
    }

    /// Merged mask geometry, or `None` when the data could not be read
    ///
    /// Failures here are access decisions (deny), so they are logged and
    /// left uncached.
    async fn collect_mask(
        &self,
        principal: Option<&Principal>,
        layer: &LayerHandle,
        filter_template: &str,
    ) -> Option<MultiPolygon<f64>> {
        let tokens = match self.permissions.get_permissions(principal).await {
            Ok(tokens) => tokens,
            Err(e) => {
                error!("Failed to fetch permissions, denying raster access: {}", e);
                return None;
            }
        };

        let predicate = compile_predicate(filter_template, &tokens);

        let mut features = match self.catalog.query_features(layer, &predicate).await {
            Ok(features) => features,
            Err(e) => {
                error!("Failed to query mask layer {}, denying raster access: {}", layer.name, e);
                return None;
            }
        };

        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        while let Some(feature) = features.next().await {
            match feature {
                Ok(Geometry::Polygon(polygon)) => polygons.push(polygon),
                Ok(Geometry::MultiPolygon(multi)) => polygons.extend(multi.0),
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to read mask layer {}, denying raster access: {}", layer.name, e);
                    return None;
                }
            }
        }

        if polygons.is_empty() {
            debug!("No mask features matched {}, restricted area is empty", predicate);
        }

        Some(MultiPolygon::new(polygons))
    }

    fn reproject(
        &self,
        geometry: MultiPolygon<f64>,
        from: Option<&Crs>,
        to: Option<&Crs>,
    ) -> Result<MultiPolygon<f64>> {
        let (Some(from), Some(to)) = (from, to) else {
            return Ok(geometry);
        };
        if geometry.0.is_empty() || from.equals_ignore_metadata(to) {
            return Ok(geometry);
        }

        debug!("Reprojecting ROI from {} to {}", from, to);
        self.reprojector
            .reproject(&geometry, from, to)
            .map_err(|e| match e {
                AccessError::ReprojectionFailed { .. } => e,
                other => AccessError::ReprojectionFailed {
                    from: from.to_string(),
                    to: to.to_string(),
                    reason: other.to_string(),
                },
            })
    }
}
