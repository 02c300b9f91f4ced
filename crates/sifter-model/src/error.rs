//! Error types for filter/lookup metadata construction and use.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A filter was declared without any lookups.
    #[error("filter must declare at least one lookup")]
    NoLookups,

    /// The configured default lookup does not name one of the filter's
    /// declared lookups.
    #[error("default lookup `{0}` is not one of the filter's declared lookups")]
    UnknownDefaultLookup(String),

    /// `transmute` was called on a filter that has not been bound into a
    /// filter set. This is a programmer-usage error.
    #[error("filter `{label}` has not been bound to a field")]
    UnboundFilter { label: String },

    /// A choice lookup has no static choices, no resolver, and no catalog
    /// field to draw an enumeration from.
    #[error("cannot resolve choices for lookup `{lookup}`: no static choices, no resolver, and no backing field")]
    UnresolvableChoices { lookup: String },

    /// A declared filter names a field the catalog does not expose.
    #[error("declared filter `{field}` does not exist on entity `{entity}`")]
    UnknownFilterField { entity: String, field: String },

    /// Failed to encode a description document.
    #[error("failed to encode description: {0}")]
    Encode(#[from] serde_json::Error),
}
