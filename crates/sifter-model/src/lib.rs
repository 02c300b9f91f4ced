//! Sifter filter/lookup metadata model
//!
//! This crate defines the declarative metadata a caller uses to describe
//! which fields of an entity may be filtered and by which operators, plus
//! the backend-neutral predicate tree that filtering requests are lowered
//! into:
//!
//! - `Lookup`: a named operator (`exact`, `icontains`, ...) with a display
//!   kind (free-text input vs. enumerated choice) and a human label.
//! - `Filter`: binds one or more lookups to a single field, with a default
//!   lookup, a label, an exchangeable predicate-construction strategy, and
//!   optional sticky/solvent default semantics.
//! - `Predicate`: the combinable "keep records where ..." tree handed to an
//!   external executor.
//! - `FieldCatalog`: the collaborator interface supplying field existence,
//!   permitted lookups, labels, help text, and choice enumerations.
//!
//! Metadata is constructed once at startup and treated as an immutable
//! template thereafter; request-scoped state lives in `sifter-query`.

pub mod catalog;
pub mod error;
pub mod filter;
pub mod lookup;
pub mod predicate;

pub use catalog::{FieldCatalog, FieldHandle, MemoryCatalog};
pub use error::ModelError;
pub use filter::{
    CleanedValue, FieldLookupStrategy, Filter, FilterDescription, PredicateStrategy,
    TransmuteContext,
};
pub use lookup::{
    Choice, ChoiceResolver, ChoiceSource, Lookup, LookupDescription, LookupExpr, LookupKind,
};
pub use predicate::Predicate;
