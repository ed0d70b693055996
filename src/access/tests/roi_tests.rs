//! Raster access through a vector mask layer

mod common;

use common::{square, Harness, MemoryCatalog, BROKEN_CRS, OFFSET};
use geo_types::{coord, Geometry, MultiPolygon, Point};
use layergate_access::strategy::{MASK_FILTER_TEMPLATE_OPTION, MASK_LAYER_OPTION};
use layergate_access::{
    AccessError, AccessLimits, Crs, Principal, Resource, ResourceKind, RuleEntry, RuleTable,
    StrategyConfig,
};

const MASK_CRS: &str = "EPSG:4326";

/// Areas layer with four polygons in total, plus a point that is not area
fn areas_catalog() -> MemoryCatalog {
    let catalog = MemoryCatalog::new();
    catalog.add_layer(
        "topp:areas",
        ResourceKind::Vector,
        Some(Crs::new(MASK_CRS)),
        vec![
            Geometry::Polygon(square(0.0, 0.0)),
            Geometry::Point(Point::new(5.0, 5.0)),
            Geometry::MultiPolygon(MultiPolygon::new(vec![square(2.0, 0.0), square(4.0, 0.0)])),
            Geometry::Polygon(square(6.0, 0.0)),
        ],
    );
    catalog.add_layer(
        "topp:dem",
        ResourceKind::Coverage,
        Some(Crs::new(MASK_CRS)),
        Vec::new(),
    );
    catalog
}

fn masked_table(mask_layer: &str) -> RuleTable {
    RuleTable::new()
        .with_strategy(
            StrategyConfig::new("masked", "permission-filter")
                .with_option(MASK_LAYER_OPTION, mask_layer)
                .with_option(MASK_FILTER_TEMPLATE_OPTION, "area_id IN ({0})"),
        )
        .with_strategy(StrategyConfig::new("unmasked", "permission-filter"))
        .with_rule(RuleEntry::new("topp", "*", "masked"))
        .with_rule(RuleEntry::new("plain", "*", "unmasked"))
}

fn masked_harness() -> Harness {
    let harness = Harness::with_catalog(masked_table("topp:areas"), areas_catalog());
    harness.source.grant("alice", &["1", "2"]);
    harness
}

fn coverage(crs: &str) -> Resource {
    Resource::coverage("topp", "landsat").with_crs(Crs::new(crs))
}

fn roi(limits: &AccessLimits) -> &MultiPolygon<f64> {
    limits.roi().expect("coverage limits carry a ROI")
}

#[tokio::test]
async fn test_mask_polygons_are_merged() {
    let harness = masked_harness();
    let alice = Principal::new("alice");

    let limits = harness
        .engine
        .get_access_limits(Some(&alice), &coverage(MASK_CRS))
        .await
        .unwrap();

    assert_eq!(roi(&limits).0.len(), 4);
    assert_eq!(limits.read_filter().to_string(), "service_id IN (1, 2)");
    assert_eq!(harness.catalog.queries(), vec!["area_id IN (1, 2)".to_string()]);

    // Same CRS: no transformation
    assert_eq!(harness.reprojector.calls(), 0);
}

#[tokio::test]
async fn test_mask_is_reprojected_to_resource_crs() {
    let harness = masked_harness();
    let alice = Principal::new("alice");

    let limits = harness
        .engine
        .get_access_limits(Some(&alice), &coverage("EPSG:3857"))
        .await
        .unwrap();

    let first = &roi(&limits).0[0];
    assert_eq!(first.exterior().0[0], coord! { x: OFFSET, y: 0.0 });
    assert_eq!(harness.reprojector.calls(), 1);
}

#[tokio::test]
async fn test_crs_metadata_is_ignored() {
    let harness = masked_harness();
    let resource =
        Resource::coverage("topp", "landsat").with_crs(Crs::new(MASK_CRS).with_name("WGS 84"));

    harness
        .engine
        .get_access_limits(Some(&Principal::new("alice")), &resource)
        .await
        .unwrap();

    assert_eq!(harness.reprojector.calls(), 0);
}

#[tokio::test]
async fn test_cached_mask_serves_every_crs() {
    let harness = masked_harness();
    let alice = Principal::new("alice");

    let native = harness
        .engine
        .get_access_limits(Some(&alice), &coverage(MASK_CRS))
        .await
        .unwrap();
    let projected = harness
        .engine
        .get_access_limits(Some(&alice), &coverage("EPSG:3857"))
        .await
        .unwrap();

    // One catalog query; the cached geometry is still in the mask's CRS
    assert_eq!(harness.catalog.queries().len(), 1);
    assert_eq!(roi(&native).0[0].exterior().0[0], coord! { x: 0.0, y: 0.0 });
    assert_eq!(
        roi(&projected).0[0].exterior().0[0],
        coord! { x: OFFSET, y: 0.0 }
    );
}

#[tokio::test]
async fn test_roi_eviction_requeries() {
    let harness = masked_harness();
    let alice = Principal::new("alice");

    harness
        .engine
        .get_access_limits(Some(&alice), &coverage(MASK_CRS))
        .await
        .unwrap();
    assert!(harness.engine.evict_roi_cache(alice.cache_key()));
    harness
        .engine
        .get_access_limits(Some(&alice), &coverage(MASK_CRS))
        .await
        .unwrap();

    assert_eq!(harness.catalog.queries().len(), 2);
    assert!(harness.engine.evict_all_roi_cache());
}

#[tokio::test]
async fn test_reprojection_failure_is_an_error() {
    let harness = masked_harness();

    let result = harness
        .engine
        .get_access_limits(Some(&Principal::new("alice")), &coverage(BROKEN_CRS))
        .await;

    match result {
        Err(AccessError::ReprojectionFailed { from, to, .. }) => {
            assert_eq!(from, MASK_CRS);
            assert_eq!(to, BROKEN_CRS);
        }
        other => panic!("expected ReprojectionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_principal_without_tokens_gets_empty_roi() {
    let harness = masked_harness();

    let limits = harness
        .engine
        .get_access_limits(Some(&Principal::new("stranger")), &coverage("EPSG:3857"))
        .await
        .unwrap();

    assert!(roi(&limits).0.is_empty());
    assert!(limits.read_filter().is_exclude());
    assert!(limits.denies_read());
    assert_eq!(harness.catalog.queries(), vec!["EXCLUDE".to_string()]);

    // Nothing to transform
    assert_eq!(harness.reprojector.calls(), 0);
}

#[tokio::test]
async fn test_permission_failure_denies_without_caching() {
    let harness = masked_harness();
    let alice = Principal::new("alice");
    harness.source.set_failing(true);

    let limits = harness
        .engine
        .get_access_limits(Some(&alice), &coverage(MASK_CRS))
        .await
        .unwrap();
    assert!(roi(&limits).0.is_empty());
    assert!(harness.catalog.queries().is_empty());

    harness.source.set_failing(false);
    let limits = harness
        .engine
        .get_access_limits(Some(&alice), &coverage(MASK_CRS))
        .await
        .unwrap();
    assert_eq!(roi(&limits).0.len(), 4);
}

#[tokio::test]
async fn test_tiled_service_is_masked() {
    let harness = masked_harness();

    let limits = harness
        .engine
        .get_access_limits(
            Some(&Principal::new("alice")),
            &Resource::tiled_service("topp", "basemap").with_crs(Crs::new(MASK_CRS)),
        )
        .await
        .unwrap();

    assert!(matches!(limits, AccessLimits::Service { get_info_allowed: true, .. }));
    assert_eq!(roi(&limits).0.len(), 4);
}

#[tokio::test]
async fn test_resource_without_crs_keeps_mask_crs() {
    let harness = masked_harness();

    let limits = harness
        .engine
        .get_access_limits(
            Some(&Principal::new("alice")),
            &Resource::coverage("topp", "landsat"),
        )
        .await
        .unwrap();

    assert_eq!(roi(&limits).0.len(), 4);
    assert_eq!(harness.reprojector.calls(), 0);
}

#[tokio::test]
async fn test_no_mask_means_unrestricted() {
    let harness = masked_harness();
    let alice = Principal::new("alice");

    let limits = harness
        .engine
        .get_access_limits(Some(&alice), &Resource::coverage("plain", "dem"))
        .await
        .unwrap();
    assert!(limits.roi().is_none());

    // Vector resources never build a mask
    let limits = harness
        .engine
        .get_access_limits(Some(&alice), &Resource::vector("topp", "states"))
        .await
        .unwrap();
    assert!(limits.roi().is_none());
    assert!(harness.catalog.queries().is_empty());
}

#[tokio::test]
async fn test_missing_mask_layer() {
    let harness = Harness::with_catalog(masked_table("topp:nowhere"), areas_catalog());

    let result = harness
        .engine
        .get_access_limits(Some(&Principal::new("alice")), &coverage(MASK_CRS))
        .await;

    assert!(matches!(result, Err(AccessError::MaskLayerNotFound(name)) if name == "topp:nowhere"));
}

#[tokio::test]
async fn test_raster_mask_layer_is_rejected() {
    let harness = Harness::with_catalog(masked_table("topp:dem"), areas_catalog());

    let result = harness
        .engine
        .get_access_limits(Some(&Principal::new("alice")), &coverage(MASK_CRS))
        .await;

    assert!(matches!(result, Err(AccessError::MaskLayerNotVector(_))));
}
