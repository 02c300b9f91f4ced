//! Filter sets: registry derivation, definitions, and per-request state.
//!
//! A `FilterSetDef` is built explicitly at startup from declared filters
//! and/or a `FilterScope` over a `FieldCatalog`, deriving the
//! `valid_filters` registry (field name -> sorted set of permitted lookup
//! names) once. The definition is immutable and shared read-only across
//! requests; every incoming request gets its own `FilterQuery`, which owns
//! the raw query data, accumulated validation errors, and the derived
//! expression tree.
//!
//! Validation is intentionally shallow: it inspects the single top-level
//! connector plus the flat list of leaf criteria below it, and skips
//! nested `and`/`or`/`not` entries without descending. This preserves the
//! documented limitation of the historical design (see DESIGN.md).

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use tracing::{debug, warn};

use sifter_model::{FieldCatalog, Filter, Lookup, ModelError, Predicate};

use crate::query::{parse_lookup_expr, Connector, QueryError, QueryNode, NOT_TOKEN};

/// Error key for problems not attributable to a single field.
pub const NON_FIELD_KEY: &str = "__all__";
/// Validation reason: the field is not in `valid_filters`.
pub const INVALID_FILTER: &str = "invalid filter";
/// Validation reason: the field is known but the lookup is not permitted.
pub const INVALID_FILTER_LOOKUP: &str = "invalid filter lookup";
/// Validation reason: the top-level connector token is unrecognized.
pub const INVALID_OPERATOR: &str = "invalid operator";

/// Field name -> sorted set of permitted canonical lookup names.
pub type ValidFilters = BTreeMap<String, BTreeSet<String>>;

// ============================================================================
// Registry derivation
// ============================================================================

/// Which catalog fields (and which of their lookups) a definition exposes.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterScope {
    /// Every catalog field with every lookup the backend supports.
    AllFields,
    /// Only the named fields, each restricted to the named lookups
    /// (intersected with what the backend supports).
    Explicit(ValidFilters),
}

/// Derive the `valid_filters` registry for `entity` under `scope`.
///
/// Output is sorted on both levels, so identical metadata and scope always
/// produce identical registries.
pub fn derive_valid_filters(
    catalog: &dyn FieldCatalog,
    entity: &str,
    scope: &FilterScope,
) -> ValidFilters {
    let mut valid = ValidFilters::new();
    for field in catalog.field_names(entity) {
        let available = catalog.list_lookups(entity, &field);
        let selected: BTreeSet<String> = match scope {
            FilterScope::AllFields => available,
            FilterScope::Explicit(map) => match map.get(&field) {
                Some(wanted) => available.intersection(wanted).cloned().collect(),
                None => continue,
            },
        };
        if selected.is_empty() {
            continue;
        }
        valid.insert(field, selected);
    }
    debug!(entity, fields = valid.len(), "derived valid filters");
    valid
}

/// Generate one `Filter` per in-scope catalog field, with an input lookup
/// for every permitted lookup name. An absent scope generates nothing.
pub fn filters_for_model(
    catalog: &dyn FieldCatalog,
    entity: &str,
    scope: Option<&FilterScope>,
) -> Result<Vec<(String, Filter)>, ModelError> {
    let Some(scope) = scope else {
        return Ok(Vec::new());
    };
    let valid = derive_valid_filters(catalog, entity, scope);
    let mut out = Vec::new();
    // Catalog order, not registry order, so generated sets read like the
    // entity declaration.
    for field in catalog.field_names(entity) {
        let Some(lookup_names) = valid.get(&field) else {
            continue;
        };
        let label = catalog
            .get_field(entity, &field)
            .map(|handle| handle.label().to_string())
            .unwrap_or_else(|| field.clone());
        let lookups: Vec<Lookup> = lookup_names
            .iter()
            .map(|name| Lookup::input(name.as_str(), name.as_str()))
            .collect();
        out.push((field, Filter::new(label, lookups)?));
    }
    Ok(out)
}

// ============================================================================
// Definitions
// ============================================================================

/// Builder for `FilterSetDef`: declared filters plus an optional scope for
/// generated ones. This replaces implicit class-definition-time derivation
/// with an explicit startup step.
#[derive(Debug, Clone, Default)]
pub struct FilterSetBuilder {
    entity: String,
    declared: Vec<(String, Filter)>,
    scope: Option<FilterScope>,
}

impl FilterSetBuilder {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            declared: Vec::new(),
            scope: None,
        }
    }

    /// Declare a filter for `field`. Declared filters take precedence over
    /// scope-generated ones.
    pub fn filter(mut self, field: impl Into<String>, filter: Filter) -> Self {
        self.declared.push((field.into(), filter));
        self
    }

    pub fn scope(mut self, scope: FilterScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn build(self, catalog: &dyn FieldCatalog) -> Result<FilterSetDef, ModelError> {
        let mut filters: Vec<(String, Filter)> = Vec::new();
        for (field, filter) in &self.declared {
            if !catalog.field_exists(&self.entity, field) {
                return Err(ModelError::UnknownFilterField {
                    entity: self.entity.clone(),
                    field: field.clone(),
                });
            }
            filters.push((field.clone(), filter.bind(field, &self.entity)));
        }
        for (field, filter) in filters_for_model(catalog, &self.entity, self.scope.as_ref())? {
            if filters.iter().any(|(declared, _)| declared == &field) {
                continue;
            }
            let bound = filter.bind(&field, &self.entity);
            filters.push((field, bound));
        }
        let mut valid_filters = ValidFilters::new();
        for (field, filter) in &filters {
            valid_filters.insert(field.clone(), filter.lookup_names());
        }
        debug!(
            entity = %self.entity,
            filters = filters.len(),
            "built filter set definition"
        );
        Ok(FilterSetDef {
            entity: self.entity,
            filters,
            valid_filters,
        })
    }
}

/// Immutable filter set definition: the entity association, the ordered
/// bound filters, and the derived `valid_filters` registry.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSetDef {
    entity: String,
    filters: Vec<(String, Filter)>,
    valid_filters: ValidFilters,
}

impl FilterSetDef {
    pub fn builder(entity: impl Into<String>) -> FilterSetBuilder {
        FilterSetBuilder::new(entity)
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &Filter)> {
        self.filters
            .iter()
            .map(|(field, filter)| (field.as_str(), filter))
    }

    pub fn get_filter(&self, field: &str) -> Option<&Filter> {
        self.filters
            .iter()
            .find(|(declared, _)| declared == field)
            .map(|(_, filter)| filter)
    }

    pub fn valid_filters(&self) -> &ValidFilters {
        &self.valid_filters
    }

    /// Start a request-scoped query against this definition.
    pub fn query(&self, query_data: Value) -> FilterQuery<'_> {
        FilterQuery {
            def: self,
            query_data,
            expression: None,
            errors: BTreeMap::new(),
            validated: None,
        }
    }

    /// Lower an expression tree into a predicate.
    ///
    /// Criteria delegate to their field's bound filter; negation of an
    /// absent inner contributes nothing; connectors drop absent children
    /// and collapse empty/singular survivor sets. The tree's criteria must
    /// already have been validated against `valid_filters`.
    pub fn node_predicate(&self, node: &QueryNode) -> Result<Option<Predicate>, QueryError> {
        match node {
            QueryNode::Criterion(criterion) => {
                let filter = self.get_filter(&criterion.field).ok_or_else(|| {
                    QueryError::InvalidQueryData(format!(
                        "no filter bound for field `{}`",
                        criterion.field
                    ))
                })?;
                Ok(filter.transmute(&criterion.value, criterion.lookup.as_ref())?)
            }
            QueryNode::Not(child) => Ok(self.node_predicate(child)?.map(Predicate::negate)),
            QueryNode::Connector { op, children } => {
                let mut survivors = Vec::new();
                for child in children {
                    if let Some(predicate) = self.node_predicate(child)? {
                        survivors.push(predicate);
                    }
                }
                Ok(match op {
                    Connector::And => Predicate::all(survivors),
                    Connector::Or => Predicate::any(survivors),
                })
            }
        }
    }
}

/// Schema-only variant: just the entity association and the derived
/// registry, without filter metadata. Enough to drive the structural JSON
/// schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSchemaDef {
    entity: String,
    valid_filters: ValidFilters,
}

impl FilterSchemaDef {
    pub fn derive(catalog: &dyn FieldCatalog, entity: impl Into<String>, scope: &FilterScope) -> Self {
        let entity = entity.into();
        let valid_filters = derive_valid_filters(catalog, &entity, scope);
        Self {
            entity,
            valid_filters,
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn valid_filters(&self) -> &ValidFilters {
        &self.valid_filters
    }
}

// ============================================================================
// Per-request query state
// ============================================================================

/// One incoming filter request against a shared `FilterSetDef`.
///
/// Owns the raw query data, the accumulated validation errors, and (after
/// successful validation) the derived expression tree. Construct one per
/// request; definitions never carry request state.
#[derive(Debug)]
pub struct FilterQuery<'a> {
    def: &'a FilterSetDef,
    query_data: Value,
    expression: Option<QueryNode>,
    errors: BTreeMap<String, Vec<String>>,
    validated: Option<bool>,
}

impl<'a> FilterQuery<'a> {
    pub fn query_data(&self) -> &Value {
        &self.query_data
    }

    /// Per-field validation errors. Empty iff the request is valid.
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// The derived expression tree, present only after successful
    /// validation.
    pub fn expression(&self) -> Option<&QueryNode> {
        self.expression.as_ref()
    }

    /// Validate the raw query data against the definition's registry.
    ///
    /// Returns `Ok(false)` with populated `errors()` for semantic problems
    /// (unknown fields/lookups, bad top-level operator); `Err` only for
    /// structural malformation. Idempotent: validation runs once.
    pub fn is_valid(&mut self) -> Result<bool, QueryError> {
        if let Some(valid) = self.validated {
            return Ok(valid);
        }
        self.run_validation()?;
        let valid = self.errors.is_empty();
        self.validated = Some(valid);
        if !valid {
            warn!(
                entity = self.def.entity(),
                fields = self.errors.len(),
                "query data failed validation"
            );
        }
        Ok(valid)
    }

    fn run_validation(&mut self) -> Result<(), QueryError> {
        self.errors = collect_errors(self.def.valid_filters(), &self.query_data)?;
        if self.errors.is_empty() && !self.query_data.is_null() {
            match &self.query_data {
                Value::Array(items) if items.is_empty() => {}
                data => self.expression = Some(QueryNode::from_query_data(data)?),
            }
        }
        Ok(())
    }

    /// Build the combined predicate for this request.
    ///
    /// `QueryError::InvalidFilterSet` unless `is_valid()` has returned
    /// `true`. Sticky filters whose field the request never mentions
    /// contribute their default predicate, AND-combined with the
    /// expression's own predicate. `Ok(None)` means no filtering applies.
    pub fn predicate(&self) -> Result<Option<Predicate>, QueryError> {
        if self.validated != Some(true) {
            return Err(QueryError::InvalidFilterSet);
        }
        let mut parts = Vec::new();
        if let Some(expression) = &self.expression {
            if let Some(predicate) = self.def.node_predicate(expression)? {
                parts.push(predicate);
            }
        }
        let mentioned = self.mentioned_fields();
        for (field, filter) in self.def.filters() {
            if !filter.is_sticky() || mentioned.contains(field) {
                continue;
            }
            if let Some(predicate) = filter.sticky_predicate()? {
                parts.push(predicate);
            }
        }
        Ok(Predicate::all(parts))
    }

    /// Fields the request addresses anywhere in its expression tree. A
    /// solvent-cancelled field counts as addressed, so its sticky default
    /// is not re-injected.
    fn mentioned_fields(&self) -> BTreeSet<&str> {
        self.expression
            .iter()
            .flat_map(|expression| expression.criteria())
            .map(|criterion| criterion.field.as_str())
            .collect()
    }
}

/// Shallow validation of raw query data against a `valid_filters` registry.
///
/// Returns the per-field error map (empty means valid). Structural
/// malformation that makes the data uninterpretable is an `Err` instead of
/// a recorded error.
fn collect_errors(
    valid_filters: &ValidFilters,
    query_data: &Value,
) -> Result<BTreeMap<String, Vec<String>>, QueryError> {
    let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut record = |field: &str, reason: &str| {
        errors
            .entry(field.to_string())
            .or_default()
            .push(reason.to_string());
    };

    // Absent or empty query data is valid: no filtering applies.
    let items = match query_data {
        Value::Null => return Ok(errors),
        Value::Array(items) if items.is_empty() => return Ok(errors),
        Value::Array(items) => items,
        _ => {
            return Err(QueryError::InvalidQueryData(
                "query data must be an [operator, criteria] pair".into(),
            ))
        }
    };

    let operator_ok = items
        .first()
        .and_then(Value::as_str)
        .and_then(Connector::from_token)
        .is_some();
    if !operator_ok {
        record(NON_FIELD_KEY, INVALID_OPERATOR);
        // The top-level shape is unusable; further checks would only
        // produce noise.
        return Ok(errors);
    }
    if items.len() != 2 {
        return Err(QueryError::InvalidQueryData(
            "query data must be a 2-element [operator, criteria] pair".into(),
        ));
    }
    let entries = items[1].as_array().ok_or_else(|| {
        QueryError::InvalidQueryData("criteria must be a list of [field, details] pairs".into())
    })?;

    for entry in entries {
        let pair = entry
            .as_array()
            .filter(|pair| pair.len() == 2)
            .ok_or_else(|| {
                QueryError::InvalidQueryData(
                    "each criterion must be a 2-element [field, details] pair".into(),
                )
            })?;
        let key = pair[0].as_str().ok_or_else(|| {
            QueryError::InvalidQueryData("criterion field name must be a string".into())
        })?;

        // Nested boolean structure below the top level is not descended
        // into. Documented limitation, preserved deliberately.
        if key.eq_ignore_ascii_case(NOT_TOKEN) || Connector::from_token(key).is_some() {
            continue;
        }

        let Some(allowed) = valid_filters.get(key) else {
            record(key, INVALID_FILTER);
            continue;
        };
        let details = pair[1].as_object().ok_or_else(|| {
            QueryError::InvalidQueryData(format!("details for `{key}` must be an object"))
        })?;
        match details.get("lookup") {
            None | Some(Value::Null) => {} // default lookup substitutes
            Some(raw) => {
                let lookup = parse_lookup_expr(raw)?;
                if !allowed.contains(&lookup.canonical()) {
                    record(key, INVALID_FILTER_LOOKUP);
                }
            }
        }
    }

    Ok(errors)
}
