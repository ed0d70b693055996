//! Access-limits value objects handed back to the host

use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::error::{AccessError, Result};
use crate::predicate::Predicate;
use crate::types::{CatalogMode, ResourceKind};

/// What a principal may do with one resource, by resource kind
#[derive(Debug, Clone, PartialEq)]
pub enum AccessLimits {
    /// Feature type
    Vector {
        catalog_mode: CatalogMode,
        read_filter: Predicate,
        write_filter: Predicate,
    },

    /// Raster coverage
    Coverage {
        catalog_mode: CatalogMode,
        read_filter: Predicate,
        /// `None` means no spatial restriction; an empty geometry denies all
        roi: Option<MultiPolygon<f64>>,
    },

    /// Cascaded tiled raster service
    Service {
        catalog_mode: CatalogMode,
        read_filter: Predicate,
        roi: Option<MultiPolygon<f64>>,
        get_info_allowed: bool,
    },
}

impl AccessLimits {
    /// Limits of the right shape for `kind`
    ///
    /// `write_filter` only applies to vector resources; `roi` only to the
    /// raster kinds. Tiled services always allow info requests.
    pub fn for_kind(
        kind: &ResourceKind,
        catalog_mode: CatalogMode,
        read_filter: Predicate,
        write_filter: Predicate,
        roi: Option<MultiPolygon<f64>>,
    ) -> Result<Self> {
        match kind {
            ResourceKind::Vector => Ok(AccessLimits::Vector {
                catalog_mode,
                read_filter,
                write_filter,
            }),
            ResourceKind::Coverage => Ok(AccessLimits::Coverage {
                catalog_mode,
                read_filter,
                roi,
            }),
            ResourceKind::TiledService => Ok(AccessLimits::Service {
                catalog_mode,
                read_filter,
                roi,
                get_info_allowed: true,
            }),
            ResourceKind::Other(other) => {
                Err(AccessError::UnsupportedResourceKind(other.clone()))
            }
        }
    }

    /// Unrestricted access
    pub fn full_access(kind: &ResourceKind, catalog_mode: CatalogMode) -> Result<Self> {
        Self::for_kind(
            kind,
            catalog_mode,
            Predicate::Include,
            Predicate::Include,
            None,
        )
    }

    pub fn catalog_mode(&self) -> CatalogMode {
        match self {
            AccessLimits::Vector { catalog_mode, .. }
            | AccessLimits::Coverage { catalog_mode, .. }
            | AccessLimits::Service { catalog_mode, .. } => *catalog_mode,
        }
    }

    pub fn read_filter(&self) -> &Predicate {
        match self {
            AccessLimits::Vector { read_filter, .. }
            | AccessLimits::Coverage { read_filter, .. }
            | AccessLimits::Service { read_filter, .. } => read_filter,
        }
    }

    /// Write filter; only vector resources can be written
    pub fn write_filter(&self) -> Option<&Predicate> {
        match self {
            AccessLimits::Vector { write_filter, .. } => Some(write_filter),
            _ => None,
        }
    }

    pub fn roi(&self) -> Option<&MultiPolygon<f64>> {
        match self {
            AccessLimits::Coverage { roi, .. } | AccessLimits::Service { roi, .. } => roi.as_ref(),
            AccessLimits::Vector { .. } => None,
        }
    }

    /// True when nothing at all can be read
    pub fn denies_read(&self) -> bool {
        self.read_filter().is_exclude() || self.roi().map_or(false, |roi| roi.0.is_empty())
    }
}

/// Rights on a workspace as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceAccessLimits {
    pub catalog_mode: CatalogMode,
    pub readable: bool,
    pub writable: bool,
    pub admin: bool,
}

impl WorkspaceAccessLimits {
    pub fn full(catalog_mode: CatalogMode) -> Self {
        Self {
            catalog_mode,
            readable: true,
            writable: true,
            admin: true,
        }
    }

    pub fn read_only(catalog_mode: CatalogMode) -> Self {
        Self {
            catalog_mode,
            readable: true,
            writable: false,
            admin: false,
        }
    }
}
