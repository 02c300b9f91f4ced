//! Sifter query layer
//!
//! Turns untrusted, JSON-compatible nested filter expressions into
//! backend-neutral predicates, guarded by a registry derived from
//! `sifter-model` metadata:
//!
//! - `query`: the recursive boolean expression tree (`and`/`or`
//!   connectors, `not` negation, field criteria) with a lossless
//!   parse/serialize round trip.
//! - `filterset`: `valid_filters` registry derivation, the immutable
//!   `FilterSetDef`/`FilterSchemaDef` definitions, and the per-request
//!   `FilterQuery` carrying validation state.
//! - `schema`: two machine-readable derivations of the same registry, a
//!   strict structural JSON schema and a UI-oriented options descriptor.
//!
//! Definitions are built once at startup and shared read-only; every
//! incoming request gets its own `FilterQuery`, so concurrent requests
//! never observe each other's validation results.

pub mod filterset;
pub mod query;
pub mod schema;

pub use filterset::{
    derive_valid_filters, filters_for_model, FilterQuery, FilterScope, FilterSchemaDef,
    FilterSetBuilder, FilterSetDef, ValidFilters, INVALID_FILTER, INVALID_FILTER_LOOKUP,
    INVALID_OPERATOR, NON_FIELD_KEY,
};
pub use query::{Connector, Criterion, QueryError, QueryNode};
pub use schema::{filtering_json_schema, filtering_options, JSON_SCHEMA_DIALECT};
