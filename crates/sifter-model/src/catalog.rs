//! Field catalog: the external collaborator supplying entity/field
//! metadata.
//!
//! The core consumes this interface during registry derivation and
//! schema/options generation only; predicate transmutation needs nothing
//! from it. `MemoryCatalog` is a self-contained implementation for tests,
//! examples, and embeddings without a real backend.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::lookup::Choice;

// ============================================================================
// Field handles
// ============================================================================

/// Metadata for a single entity field as exposed by a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldHandle {
    name: String,
    label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field_type: Option<String>,
    /// Choice enumeration; may include a blank-valued sentinel entry,
    /// which description consumers exclude.
    #[serde(default)]
    choices: Vec<Choice>,
}

impl FieldHandle {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            help_text: None,
            field_type: None,
            choices: Vec::new(),
        }
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn with_field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn with_choices<I, V, L>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<String>,
        L: Into<String>,
    {
        self.choices = choices
            .into_iter()
            .map(|(value, label)| (value.into(), label.into()))
            .collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help_text.as_deref()
    }

    pub fn field_type(&self) -> Option<&str> {
        self.field_type.as_deref()
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }
}

// ============================================================================
// Catalog interface
// ============================================================================

/// Entity/field metadata provider.
///
/// Implementations must be safe to share read-only across concurrent
/// requests.
pub trait FieldCatalog: Send + Sync {
    /// All field names exposed by `entity`, in catalog order.
    fn field_names(&self, entity: &str) -> Vec<String>;

    /// Lookups the backend supports for `entity.field`.
    fn list_lookups(&self, entity: &str, field: &str) -> BTreeSet<String>;

    /// Metadata handle for `entity.field`, when the field exists.
    fn get_field(&self, entity: &str, field: &str) -> Option<FieldHandle>;

    fn field_exists(&self, entity: &str, field: &str) -> bool {
        self.get_field(entity, field).is_some()
    }
}

// ============================================================================
// In-memory catalog
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct MemoryField {
    handle: FieldHandle,
    lookups: BTreeSet<String>,
}

/// In-memory `FieldCatalog` with builder-style registration.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    /// Entity name -> fields in registration order.
    entities: BTreeMap<String, Vec<MemoryField>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field on `entity` with its supported lookups.
    pub fn with_field<I, S>(mut self, entity: &str, handle: FieldHandle, lookups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities
            .entry(entity.to_string())
            .or_default()
            .push(MemoryField {
                handle,
                lookups: lookups.into_iter().map(Into::into).collect(),
            });
        self
    }

    fn field(&self, entity: &str, field: &str) -> Option<&MemoryField> {
        self.entities
            .get(entity)?
            .iter()
            .find(|f| f.handle.name() == field)
    }
}

impl FieldCatalog for MemoryCatalog {
    fn field_names(&self, entity: &str) -> Vec<String> {
        self.entities
            .get(entity)
            .map(|fields| fields.iter().map(|f| f.handle.name().to_string()).collect())
            .unwrap_or_default()
    }

    fn list_lookups(&self, entity: &str, field: &str) -> BTreeSet<String> {
        self.field(entity, field)
            .map(|f| f.lookups.clone())
            .unwrap_or_default()
    }

    fn get_field(&self, entity: &str, field: &str) -> Option<FieldHandle> {
        self.field(entity, field).map(|f| f.handle.clone())
    }
}
