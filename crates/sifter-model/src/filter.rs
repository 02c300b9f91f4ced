//! Filters: field-to-lookup bindings with sticky/solvent defaults.
//!
//! A `Filter` is an immutable template declared once at startup. Binding it
//! into a filter set produces an independent copy carrying the field name
//! and entity association; the template itself is never mutated, so one
//! declaration can back arbitrarily many concurrent requests.
//!
//! Sticky semantics: a filter with a `sticky_value` contributes a default
//! predicate when a request never mentions its field. A request that
//! explicitly supplies the configured `solvent_value` cancels that default:
//! cleaning maps the value to `CleanedValue::Unstuck` and transmutation
//! contributes nothing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::catalog::FieldHandle;
use crate::error::ModelError;
use crate::lookup::{Lookup, LookupDescription, LookupExpr};
use crate::predicate::Predicate;

// ============================================================================
// Cleaning and transmutation
// ============================================================================

/// Result of cleaning a request-supplied value against a filter's solvent
/// configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanedValue {
    Value(Value),
    /// The caller explicitly supplied the solvent value: remove the
    /// filter's contribution instead of building a predicate.
    Unstuck,
}

/// Inputs handed to a predicate-construction strategy.
#[derive(Debug, Clone, Copy)]
pub struct TransmuteContext<'a> {
    /// Entity type the owning filter set is bound to.
    pub entity: &'a str,
    /// Bound field name of the filter.
    pub field: &'a str,
    /// Effective lookup: request-supplied, else the filter's default.
    pub lookup: &'a LookupExpr,
    /// Cleaned request value.
    pub value: &'a Value,
}

/// Predicate-construction strategy for a filter.
///
/// The default `FieldLookupStrategy` builds a single comparison over the
/// bound field; custom strategies may build arbitrarily different
/// predicates (e.g. mapping one logical choice to a set-membership
/// predicate over another field). Returning `None` contributes nothing.
pub trait PredicateStrategy: Send + Sync {
    fn build(&self, ctx: TransmuteContext<'_>) -> Option<Predicate>;
}

impl<F> PredicateStrategy for F
where
    F: Fn(TransmuteContext<'_>) -> Option<Predicate> + Send + Sync,
{
    fn build(&self, ctx: TransmuteContext<'_>) -> Option<Predicate> {
        self(ctx)
    }
}

/// Default strategy: one `field <op> value` comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldLookupStrategy;

impl PredicateStrategy for FieldLookupStrategy {
    fn build(&self, ctx: TransmuteContext<'_>) -> Option<Predicate> {
        Some(Predicate::compare(
            ctx.field,
            ctx.lookup.canonical(),
            ctx.value.clone(),
        ))
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Declarative binding of lookups to a single entity field.
///
/// `name` and `entity` are unset on templates and assigned by `bind` when
/// the filter is placed into a filter set.
#[derive(Clone)]
pub struct Filter {
    name: Option<String>,
    entity: Option<String>,
    lookups: Vec<Lookup>,
    default_lookup: LookupExpr,
    label: String,
    strategy: Arc<dyn PredicateStrategy>,
    sticky_value: Option<Value>,
    solvent_value: Option<Value>,
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("entity", &self.entity)
            .field("lookups", &self.lookups)
            .field("default_lookup", &self.default_lookup)
            .field("label", &self.label)
            .field("sticky_value", &self.sticky_value)
            .field("solvent_value", &self.solvent_value)
            .finish()
    }
}

// Strategy trait objects are not comparable; equality covers the
// declarative metadata only.
impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.entity == other.entity
            && self.lookups == other.lookups
            && self.default_lookup == other.default_lookup
            && self.label == other.label
            && self.sticky_value == other.sticky_value
            && self.solvent_value == other.solvent_value
    }
}

impl Filter {
    /// A filter with the given label and lookups. The default lookup is the
    /// first declared one unless overridden with `with_default_lookup`.
    pub fn new(label: impl Into<String>, lookups: Vec<Lookup>) -> Result<Self, ModelError> {
        let default_lookup = lookups.first().ok_or(ModelError::NoLookups)?.name().clone();
        Ok(Self {
            name: None,
            entity: None,
            lookups,
            default_lookup,
            label: label.into(),
            strategy: Arc::new(FieldLookupStrategy),
            sticky_value: None,
            solvent_value: None,
        })
    }

    pub fn with_default_lookup(mut self, name: impl Into<LookupExpr>) -> Result<Self, ModelError> {
        let name = name.into();
        if !self.lookups.iter().any(|lookup| lookup.name() == &name) {
            return Err(ModelError::UnknownDefaultLookup(name.canonical()));
        }
        self.default_lookup = name;
        Ok(self)
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn PredicateStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Make the filter sticky: `value` becomes the field's default-applied
    /// filter value for requests that do not address the field.
    pub fn with_sticky_value(mut self, value: Value) -> Self {
        self.sticky_value = Some(value);
        self
    }

    /// Configure the explicit "cancel the sticky default" value.
    pub fn with_solvent_value(mut self, value: Value) -> Self {
        self.solvent_value = Some(value);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn lookups(&self) -> &[Lookup] {
        &self.lookups
    }

    pub fn default_lookup(&self) -> &LookupExpr {
        &self.default_lookup
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky_value.is_some()
    }

    pub fn sticky_value(&self) -> Option<&Value> {
        self.sticky_value.as_ref()
    }

    pub fn solvent_value(&self) -> Option<&Value> {
        self.solvent_value.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.name.is_some()
    }

    /// Canonical names of the declared lookups, sorted.
    pub fn lookup_names(&self) -> std::collections::BTreeSet<String> {
        self.lookups
            .iter()
            .map(Lookup::canonical_name)
            .collect()
    }

    /// Produce an independent bound copy for `field` on `entity`. The
    /// template is left untouched.
    pub fn bind(&self, field: &str, entity: &str) -> Filter {
        let mut bound = self.clone();
        bound.name = Some(field.to_string());
        bound.entity = Some(entity.to_string());
        bound
    }

    /// Clean a request-supplied value against the solvent configuration.
    pub fn clean(&self, value: &Value) -> CleanedValue {
        match &self.solvent_value {
            Some(solvent) if solvent == value => CleanedValue::Unstuck,
            _ => CleanedValue::Value(value.clone()),
        }
    }

    /// Lower a request value into a predicate, or `None` when the value is
    /// the solvent (an explicit cancel) or the strategy declines.
    ///
    /// `lookup` is the request-supplied lookup; the filter's default
    /// substitutes when absent. Only bound filters can transmute.
    pub fn transmute(
        &self,
        value: &Value,
        lookup: Option<&LookupExpr>,
    ) -> Result<Option<Predicate>, ModelError> {
        let (field, entity) = match (&self.name, &self.entity) {
            (Some(field), Some(entity)) => (field.as_str(), entity.as_str()),
            _ => {
                return Err(ModelError::UnboundFilter {
                    label: self.label.clone(),
                })
            }
        };
        let value = match self.clean(value) {
            CleanedValue::Unstuck => return Ok(None),
            CleanedValue::Value(value) => value,
        };
        let lookup = lookup.unwrap_or(&self.default_lookup);
        Ok(self.strategy.build(TransmuteContext {
            entity,
            field,
            lookup,
            value: &value,
        }))
    }

    /// The default predicate a sticky filter contributes when its field is
    /// absent from the request. `None` for non-sticky filters.
    pub fn sticky_predicate(&self) -> Result<Option<Predicate>, ModelError> {
        match &self.sticky_value {
            Some(value) => self.transmute(value, None),
            None => Ok(None),
        }
    }

    /// Describe this filter for the options descriptor.
    pub fn describe(&self, field: Option<&FieldHandle>) -> Result<FilterDescription, ModelError> {
        let mut lookups = BTreeMap::new();
        for lookup in &self.lookups {
            lookups.insert(lookup.canonical_name(), lookup.describe(field)?);
        }
        let description = field
            .and_then(|f| f.help_text())
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        let sticky_default = match (&self.name, &self.sticky_value) {
            (Some(name), Some(sticky)) => Some(json!([
                name,
                {"lookup": self.default_lookup.canonical(), "value": sticky},
            ])),
            _ => None,
        };
        Ok(FilterDescription {
            default_lookup: self.default_lookup.canonical(),
            label: self.label.clone(),
            lookups,
            description,
            sticky_default,
            solvent_value: self.solvent_value.clone(),
        })
    }
}

/// Options-descriptor entry for a filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterDescription {
    pub default_lookup: String,
    pub label: String,
    pub lookups: BTreeMap<String, LookupDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Serialized criterion data for the sticky default, present on bound
    /// sticky filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky_default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solvent_value: Option<Value>,
}
