//! In-memory collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use geo_types::{coord, Coord, Geometry, LineString, MultiPolygon, Polygon};
use layergate_access::error::{AccessError, Result};
use layergate_access::permissions::PermissionSource;
use layergate_access::predicate::Predicate;
use layergate_access::roi::{Catalog, LayerHandle, Reprojector};
use layergate_access::{AccessEngine, Crs, Principal, QualifiedName, ResourceKind, RuleTable};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const ADMIN_ROLE: &str = "ROLE_ADMINISTRATOR";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn tokens(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Permission source counting its calls, switchable into failure
#[derive(Default)]
pub struct CountingSource {
    permissions: DashMap<String, Vec<String>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl CountingSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, login: &str, values: &[&str]) {
        self.permissions.insert(login.to_string(), tokens(values));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionSource for CountingSource {
    async fn get_user_permissions(&self, principal: &Principal) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AccessError::PermissionSource("database unavailable".to_string()));
        }
        Ok(self
            .permissions
            .get(&principal.name)
            .map(|t| t.clone())
            .unwrap_or_default())
    }
}

/// Catalog holding a few layers and their feature geometries
///
/// Queries return every feature of the layer unless the predicate is
/// `EXCLUDE`.
#[derive(Default)]
pub struct MemoryCatalog {
    layers: DashMap<String, (LayerHandle, Vec<Geometry<f64>>)>,
    queries: Mutex<Vec<String>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(
        &self,
        name: &str,
        kind: ResourceKind,
        crs: Option<Crs>,
        features: Vec<Geometry<f64>>,
    ) {
        let qualified = QualifiedName::parse(name);
        let mut handle = LayerHandle::new(qualified.clone(), kind);
        handle.crs = crs;
        self.layers.insert(qualified.local, (handle, features));
    }

    /// Predicates the catalog was queried with, in order
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_layer(&self, name: &QualifiedName) -> Result<Option<LayerHandle>> {
        Ok(self.layers.get(&name.local).map(|entry| entry.0.clone()))
    }

    async fn query_features(
        &self,
        layer: &LayerHandle,
        predicate: &Predicate,
    ) -> Result<BoxStream<'static, Result<Geometry<f64>>>> {
        self.queries.lock().push(predicate.to_string());

        let features = if predicate.is_exclude() {
            Vec::new()
        } else {
            self.layers
                .get(&layer.name.local)
                .map(|entry| entry.1.clone())
                .unwrap_or_default()
        };

        Ok(stream::iter(features.into_iter().map(Ok)).boxed())
    }
}

/// "Reprojects" by shifting x; fails for `EPSG:9999`
#[derive(Default)]
pub struct OffsetReprojector {
    calls: AtomicUsize,
}

pub const OFFSET: f64 = 1000.0;
pub const BROKEN_CRS: &str = "EPSG:9999";

impl OffsetReprojector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Reprojector for OffsetReprojector {
    fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &Crs,
        to: &Crs,
    ) -> Result<MultiPolygon<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if to.code == BROKEN_CRS {
            return Err(AccessError::Catalog(format!(
                "no transform from {} to {}",
                from, to
            )));
        }

        let shift = |ring: &LineString<f64>| -> LineString<f64> {
            ring.0
                .iter()
                .map(|c| Coord { x: c.x + OFFSET, y: c.y })
                .collect()
        };

        Ok(MultiPolygon::new(
            geometry
                .0
                .iter()
                .map(|p| Polygon::new(shift(p.exterior()), p.interiors().iter().map(shift).collect()))
                .collect(),
        ))
    }
}

pub fn square(x: f64, y: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            coord! { x: x, y: y },
            coord! { x: x + 1.0, y: y },
            coord! { x: x + 1.0, y: y + 1.0 },
            coord! { x: x, y: y + 1.0 },
            coord! { x: x, y: y },
        ]),
        vec![],
    )
}

/// Engine wired to in-memory collaborators
pub struct Harness {
    pub engine: AccessEngine,
    pub source: Arc<CountingSource>,
    pub catalog: Arc<MemoryCatalog>,
    pub reprojector: Arc<OffsetReprojector>,
}

impl Harness {
    pub fn new(table: RuleTable) -> Self {
        Self::with_catalog(table, MemoryCatalog::new())
    }

    pub fn with_catalog(table: RuleTable, catalog: MemoryCatalog) -> Self {
        init_tracing();

        let source = Arc::new(CountingSource::new());
        let catalog = Arc::new(catalog);
        let reprojector = Arc::new(OffsetReprojector::new());

        let engine = AccessEngine::builder(source.clone(), catalog.clone(), reprojector.clone())
            .rule_table(table)
            .build()
            .expect("valid test configuration");

        Self {
            engine,
            source,
            catalog,
            reprojector,
        }
    }
}

pub fn admin(name: &str) -> Principal {
    Principal::new(name).with_role(ADMIN_ROLE)
}
