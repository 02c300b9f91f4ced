//! Schema generation: two machine-readable derivations of a
//! `valid_filters` registry.
//!
//! - `filtering_json_schema`: a strict structural JSON schema (draft
//!   2020-12) for validating the shape and allowed values of incoming
//!   filter data.
//! - `filtering_options`: a UI-oriented descriptor enumerating operators,
//!   fields, lookups, labels, choice lists, and sticky defaults for
//!   rendering a filter builder.
//!
//! Both are deterministic: registries are sorted maps and document keys
//! serialize in sorted order.

use serde_json::{json, Map, Value};

use sifter_model::{FieldCatalog, ModelError};

use crate::filterset::{FilterSchemaDef, FilterSetDef, ValidFilters};

/// JSON Schema dialect the structural schema declares.
pub const JSON_SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

// ============================================================================
// Structural schema
// ============================================================================

/// Generate the structural JSON schema for `valid_filters`.
///
/// The document's root object requires a `query` property conforming to
/// `#/$defs/and-or-op`. `and-or-op` and `not-op` are fixed 2-tuple
/// templates; one `<field>-filter` definition is generated per valid
/// field, and `filters` unions them.
pub fn filtering_json_schema(id: &str, title: &str, valid_filters: &ValidFilters) -> Value {
    let mut defs = Map::new();
    let mut filter_refs = Vec::new();
    for (field, lookups) in valid_filters {
        let def_name = format!("{field}-filter");
        defs.insert(
            def_name.clone(),
            json!({
                "type": "array",
                "prefixItems": [
                    {"const": field},
                    {
                        "type": "object",
                        "properties": {
                            "lookup": {"enum": lookups.iter().collect::<Vec<_>>()},
                            "value": {"type": "string"},
                        },
                        "required": ["value"],
                    },
                ],
                "minItems": 2,
                "maxItems": 2,
            }),
        );
        filter_refs.push(json!({"$ref": format!("#/$defs/{def_name}")}));
    }
    defs.insert("filters".to_string(), json!({"anyOf": filter_refs}));
    defs.insert(
        "not-op".to_string(),
        json!({
            "type": "array",
            "prefixItems": [
                {"const": "not"},
                {"anyOf": [
                    {"$ref": "#/$defs/filters"},
                    {"$ref": "#/$defs/and-or-op"},
                ]},
            ],
            "minItems": 2,
            "maxItems": 2,
        }),
    );
    defs.insert(
        "and-or-op".to_string(),
        json!({
            "type": "array",
            "prefixItems": [
                {"enum": ["and", "or"]},
                {
                    "type": "array",
                    "items": {"anyOf": [
                        {"$ref": "#/$defs/filters"},
                        {"$ref": "#/$defs/not-op"},
                        {"$ref": "#/$defs/and-or-op"},
                    ]},
                    "minItems": 1,
                },
            ],
            "minItems": 2,
            "maxItems": 2,
        }),
    );
    json!({
        "$id": id,
        "$schema": JSON_SCHEMA_DIALECT,
        "title": title,
        "type": "object",
        "properties": {"query": {"$ref": "#/$defs/and-or-op"}},
        "required": ["query"],
        "$defs": defs,
    })
}

// ============================================================================
// Options descriptor
// ============================================================================

/// Generate the options descriptor for a filter set.
///
/// Choice lookups resolve their choice lists here; a choice lookup with no
/// static list, no resolver, and no backing catalog field aborts
/// generation with `ModelError::UnresolvableChoices`.
pub fn filtering_options(
    def: &FilterSetDef,
    catalog: &dyn FieldCatalog,
) -> Result<Value, ModelError> {
    let operators = json!({
        "and": {"type": "operator", "label": "AND"},
        "or": {"type": "operator", "label": "OR"},
        "not": {"type": "operator", "label": "NOT"},
    });
    let mut filters = Map::new();
    for (field, filter) in def.filters() {
        let handle = catalog.get_field(def.entity(), field);
        let description = filter.describe(handle.as_ref())?;
        let mut info = match serde_json::to_value(&description)? {
            Value::Object(map) => map,
            // FilterDescription is a struct; it always encodes as an object.
            other => {
                use serde::ser::Error as _;
                return Err(ModelError::Encode(serde_json::Error::custom(format!(
                    "filter description encoded as {other}"
                ))));
            }
        };
        info.insert("type".to_string(), json!("field"));
        if let Some(field_type) = handle.as_ref().and_then(|h| h.field_type()) {
            info.insert("field_type".to_string(), json!(field_type));
        }
        filters.insert(field.to_string(), Value::Object(info));
    }
    Ok(json!({"operators": operators, "filters": filters}))
}

impl FilterSetDef {
    /// Structural JSON schema for this definition's registry.
    pub fn json_schema(&self, id: &str, title: &str) -> Value {
        filtering_json_schema(id, title, self.valid_filters())
    }

    /// Options descriptor for this definition.
    pub fn options(&self, catalog: &dyn FieldCatalog) -> Result<Value, ModelError> {
        filtering_options(self, catalog)
    }
}

impl FilterSchemaDef {
    /// Structural JSON schema for this registry-only definition.
    pub fn json_schema(&self, id: &str, title: &str) -> Value {
        filtering_json_schema(id, title, self.valid_filters())
    }
}
