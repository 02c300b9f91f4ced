//! Lookups: named field operators and their display metadata.
//!
//! A `Lookup` names an operator applicable to a field (`exact`, `gte`,
//! `icontains`, ...), carries a human label for frontends, and has a display
//! kind: free-text `Input` or enumerated `Choice`. Choice lookups resolve
//! their `(value, label)` list through a `ChoiceSource`, in order: an
//! explicit static list, a resolver callback, or the backing catalog
//! field's own enumeration (excluding blank-valued entries).

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::FieldHandle;
use crate::error::ModelError;

/// A `(value, label)` choice pair.
pub type Choice = (String, String);

// ============================================================================
// Lookup names
// ============================================================================

/// A lookup name: either a single operator (`"exact"`) or a chain of
/// transforms ending in an operator (`["year", "gte"]`), applied left to
/// right.
///
/// The wire format accepts both shapes (`string | array<string>`) and the
/// untagged serde representation preserves whichever form was supplied.
/// `canonical()` joins chain segments with `__` and is the form stored in
/// `valid_filters` registries and predicate operators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LookupExpr {
    Name(String),
    Chain(Vec<String>),
}

impl LookupExpr {
    /// Build a chain lookup from its segments.
    pub fn chain<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chain(segments.into_iter().map(Into::into).collect())
    }

    /// The canonical registry form: chain segments joined with `__`.
    pub fn canonical(&self) -> String {
        match self {
            LookupExpr::Name(name) => name.clone(),
            LookupExpr::Chain(segments) => segments.join("__"),
        }
    }
}

impl fmt::Display for LookupExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<&str> for LookupExpr {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for LookupExpr {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

// ============================================================================
// Choice sources
// ============================================================================

/// Dynamic choice resolution callback, invoked with the lookup being
/// described and the backing catalog field.
pub trait ChoiceResolver: Send + Sync {
    fn resolve(&self, lookup: &Lookup, field: &FieldHandle) -> Vec<Choice>;
}

impl<F> ChoiceResolver for F
where
    F: Fn(&Lookup, &FieldHandle) -> Vec<Choice> + Send + Sync,
{
    fn resolve(&self, lookup: &Lookup, field: &FieldHandle) -> Vec<Choice> {
        self(lookup, field)
    }
}

/// Where a choice lookup's `(value, label)` list comes from.
#[derive(Clone)]
pub enum ChoiceSource {
    /// A fixed list supplied at declaration time.
    Static(Vec<Choice>),
    /// A resolver callback receiving the lookup and the backing field.
    Resolver(Arc<dyn ChoiceResolver>),
    /// The catalog field's own enumeration, excluding blank-valued entries.
    FromCatalog,
}

impl fmt::Debug for ChoiceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChoiceSource::Static(choices) => f.debug_tuple("Static").field(choices).finish(),
            ChoiceSource::Resolver(_) => f.write_str("Resolver(..)"),
            ChoiceSource::FromCatalog => f.write_str("FromCatalog"),
        }
    }
}

impl PartialEq for ChoiceSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ChoiceSource::Static(a), ChoiceSource::Static(b)) => a == b,
            (ChoiceSource::Resolver(a), ChoiceSource::Resolver(b)) => Arc::ptr_eq(a, b),
            (ChoiceSource::FromCatalog, ChoiceSource::FromCatalog) => true,
            _ => false,
        }
    }
}

// ============================================================================
// Lookup
// ============================================================================

/// Display kind of a lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupKind {
    /// Free-text input.
    Input,
    /// Enumerated choice selection.
    Choice(ChoiceSource),
}

impl LookupKind {
    pub fn token(&self) -> &'static str {
        match self {
            LookupKind::Input => "input",
            LookupKind::Choice(_) => "choice",
        }
    }
}

/// A named field operator with display metadata. Immutable after
/// construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Lookup {
    name: LookupExpr,
    label: String,
    kind: LookupKind,
}

impl Lookup {
    /// A free-text input lookup.
    pub fn input(name: impl Into<LookupExpr>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: LookupKind::Input,
        }
    }

    /// An enumerated choice lookup drawing its choices from `source`.
    pub fn choice(
        name: impl Into<LookupExpr>,
        label: impl Into<String>,
        source: ChoiceSource,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: LookupKind::Choice(source),
        }
    }

    pub fn name(&self) -> &LookupExpr {
        &self.name
    }

    pub fn canonical_name(&self) -> String {
        self.name.canonical()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> &LookupKind {
        &self.kind
    }

    /// Describe this lookup for the options descriptor.
    ///
    /// `field` is the backing catalog field, when one exists. Choice lookups
    /// without a static list or resolver require it; its absence is
    /// `ModelError::UnresolvableChoices`.
    pub fn describe(&self, field: Option<&FieldHandle>) -> Result<LookupDescription, ModelError> {
        let choices = match &self.kind {
            LookupKind::Input => None,
            LookupKind::Choice(source) => Some(self.resolve_choices(source, field)?),
        };
        Ok(LookupDescription {
            kind: self.kind.token().to_string(),
            label: self.label.clone(),
            choices,
        })
    }

    fn resolve_choices(
        &self,
        source: &ChoiceSource,
        field: Option<&FieldHandle>,
    ) -> Result<Vec<Choice>, ModelError> {
        match source {
            ChoiceSource::Static(choices) => Ok(choices.clone()),
            ChoiceSource::Resolver(resolver) => {
                let field = field.ok_or_else(|| self.unresolvable())?;
                Ok(resolver.resolve(self, field))
            }
            ChoiceSource::FromCatalog => {
                let field = field.ok_or_else(|| self.unresolvable())?;
                Ok(field
                    .choices()
                    .iter()
                    .filter(|(value, _)| !value.is_empty())
                    .cloned()
                    .collect())
            }
        }
    }

    fn unresolvable(&self) -> ModelError {
        ModelError::UnresolvableChoices {
            lookup: self.canonical_name(),
        }
    }
}

/// Options-descriptor entry for a single lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupDescription {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}
