//! # Layergate Access-Limits Engine
//!
//! Pluggable resolution of per-principal access limits for catalog
//! resources (feature types, raster coverages, tiled raster services).
//!
//! ## Features
//!
//! - **Rule table** matching `(workspace, layer)` with a fixed wildcard cascade
//! - **Pluggable strategies** selected by binding name, with per-call options
//! - **Permission-token filters** compiled from templates, failing closed
//! - **Raster masks** (ROI) built from a vector layer and cached per principal
//! - **Atomic reload** of the rule table under concurrent readers
//!
//! ## Example
//!
//! ```rust,no_run
//! use layergate_access::{AccessEngine, Principal, Resource};
//! # use layergate_access::roi::{Catalog, Reprojector};
//! # use layergate_access::permissions::StaticPermissionSource;
//! # use std::sync::Arc;
//!
//! # async fn example(
//! #     catalog: Arc<dyn Catalog>,
//! #     reprojector: Arc<dyn Reprojector>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let table = layergate_access::rules::load_configuration("access-rules.json");
//!
//! let engine = AccessEngine::builder(
//!     Arc::new(StaticPermissionSource::new()),
//!     catalog,
//!     reprojector,
//! )
//! .rule_table(table)
//! .build()?;
//!
//! let alice = Principal::new("alice");
//! let limits = engine
//!     .get_access_limits(Some(&alice), &Resource::vector("topp", "states"))
//!     .await?;
//!
//! println!("read filter: {}", limits.read_filter());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod engine;
pub mod error;
pub mod limits;
pub mod permissions;
pub mod predicate;
pub mod roi;
pub mod rules;
pub mod strategy;
pub mod types;

// Re-export commonly used types
pub use engine::{AccessEngine, AccessEngineBuilder, AdminAuthority, EngineConfig, RoleAuthority};
pub use error::{AccessError, Result};
pub use limits::{AccessLimits, WorkspaceAccessLimits};
pub use predicate::{compile_predicate, Predicate};
pub use rules::{RuleEntry, RuleTable, StrategyConfig};
pub use strategy::{AccessLimitsStrategy, StrategyProvider};
pub use types::{CatalogMode, Crs, Principal, QualifiedName, Resource, ResourceKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
