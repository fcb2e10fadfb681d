use crate::types::{ElementId, FieldId, NodeId};
use thiserror::Error;

/// Result type for field cache operations
pub type Result<T> = std::result::Result<T, FieldCacheError>;

/// Errors raised by caches, locations and field evaluation
#[derive(Error, Debug)]
pub enum FieldCacheError {
    /// The cache handle is empty or has already been released
    #[error("Cache handle is empty or already released")]
    ReleasedCache,

    /// Location changed while a field is being evaluated against the cache
    #[error("Cache is in use by an evaluation and cannot change location")]
    CacheBusy,

    /// The region owning the cache no longer exists
    #[error("Region owning the cache has been released")]
    ReleasedRegion,

    /// Node is not part of the cache's region
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    /// Element is not part of the cache's region
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    /// Field is not part of the region
    #[error("Unknown field: {0}")]
    UnknownField(FieldId),

    /// Requested chart dimension differs from the element's own dimension
    #[error("Dimension mismatch: element {element} is {expected}-D, got dimension {actual}")]
    DimensionMismatch {
        element: ElementId,
        expected: usize,
        actual: usize,
    },

    /// Number of supplied values differs from what the target requires
    #[error("Invalid value count: expected {expected}, got {actual}")]
    ValueCountMismatch { expected: usize, actual: usize },

    /// Parent element cannot host the element
    #[error("Invalid parent element {parent} for {element}: parent must have higher dimension")]
    InvalidParent { element: ElementId, parent: ElementId },

    /// Field and cache belong to different regions
    #[error("Field {0} and cache belong to different regions")]
    RegionMismatch(FieldId),

    /// Field cannot be evaluated at the current location
    #[error("Field '{field}' is not defined at {location} location")]
    NotDefined {
        field: String,
        location: &'static str,
    },

    /// Field type does not support assignment at the current location
    #[error("Field '{0}' cannot be assigned at this location")]
    NotAssignable(String),

    /// Field definition rejected at creation time
    #[error("Invalid field definition: {0}")]
    InvalidDefinition(String),

    /// Mesh definition rejected at creation time
    #[error("Invalid mesh definition: {0}")]
    InvalidMesh(String),

    /// Recursive evaluation exceeded the configured depth
    #[error("Evaluation depth limit {0} exceeded")]
    DepthExceeded(usize),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error while loading configuration
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl FieldCacheError {
    /// Create a "not defined" error for a field at a location kind
    pub fn not_defined(field: impl Into<String>, location: &'static str) -> Self {
        Self::NotDefined {
            field: field.into(),
            location,
        }
    }

    /// Create an invalid field definition error
    pub fn invalid_definition(msg: impl Into<String>) -> Self {
        Self::InvalidDefinition(msg.into())
    }

    /// Create an invalid mesh error
    pub fn invalid_mesh(msg: impl Into<String>) -> Self {
        Self::InvalidMesh(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this is a rejected argument to a cache or location setter.
    ///
    /// Every failure of `FieldCache::set_*` falls in this class.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::ReleasedCache
                | Self::CacheBusy
                | Self::ReleasedRegion
                | Self::UnknownNode(_)
                | Self::UnknownElement(_)
                | Self::UnknownField(_)
                | Self::DimensionMismatch { .. }
                | Self::ValueCountMismatch { .. }
                | Self::InvalidParent { .. }
                | Self::RegionMismatch(_)
        )
    }
}
