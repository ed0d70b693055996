//! Error types for the access-limits engine

use thiserror::Error;

/// Access-limits engine errors
///
/// Configuration-shape problems surface as errors. Runtime data problems
/// (permission source down, broken template, empty mask query) never reach
/// this type: they are converted into deny-all results where they occur.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Bad caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The rule table is not valid
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No strategy is registered under the requested binding name
    #[error("Strategy binding not found: {0}")]
    BindingNotFound(String),

    /// Configured mask layer is not in the catalog
    #[error("Mask layer not found: {0}")]
    MaskLayerNotFound(String),

    /// Configured mask layer exists but is not a vector layer
    #[error("Mask layer is not a vector layer: {0}")]
    MaskLayerNotVector(String),

    /// The ROI could not be moved into the resource's coordinate system
    #[error("Failed to reproject ROI from {from} to {to}: {reason}")]
    ReprojectionFailed {
        from: String,
        to: String,
        reason: String,
    },

    /// Resource kind other than vector, coverage or tiled service
    #[error("Unsupported resource kind: {0}")]
    UnsupportedResourceKind(String),

    /// Permission-token source failure
    #[error("Permission source error: {0}")]
    PermissionSource(String),

    /// Resource catalog failure
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration document could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for access-limits operations
pub type Result<T> = std::result::Result<T, AccessError>;
