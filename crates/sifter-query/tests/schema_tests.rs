//! Structural schema and options descriptor generation tests.

use serde_json::json;
use sifter_model::{
    ChoiceSource, FieldHandle, Filter, Lookup, MemoryCatalog, ModelError,
};
use sifter_query::{FilterScope, FilterSchemaDef, FilterSetDef, JSON_SCHEMA_DIALECT};

fn participant_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_field(
            "participant",
            FieldHandle::new("age", "Age")
                .with_help_text("Age in years.")
                .with_field_type("integer"),
            ["exact", "gte", "lte"],
        )
        .with_field(
            "participant",
            FieldHandle::new("sex", "Sex").with_choices([
                ("", "---------"),
                ("m", "Male"),
                ("f", "Female"),
            ]),
            ["exact"],
        )
}

fn participant_set(catalog: &MemoryCatalog) -> FilterSetDef {
    let age = Filter::new(
        "Age",
        vec![Lookup::input("gte", ">="), Lookup::input("lte", "<=")],
    )
    .unwrap();
    let sex = Filter::new(
        "Sex",
        vec![Lookup::choice("exact", "is", ChoiceSource::FromCatalog)],
    )
    .unwrap();
    FilterSetDef::builder("participant")
        .filter("age", age)
        .filter("sex", sex)
        .build(catalog)
        .unwrap()
}

// ============================================================================
// Structural JSON schema
// ============================================================================

#[test]
fn json_schema_document_shape() {
    let catalog = participant_catalog();
    let def = participant_set(&catalog);
    let schema = def.json_schema("https://example.org/filters.schema.json", "Participant filters");

    assert_eq!(schema["$schema"], json!(JSON_SCHEMA_DIALECT));
    assert_eq!(
        schema["$id"],
        json!("https://example.org/filters.schema.json")
    );
    assert_eq!(schema["title"], json!("Participant filters"));
    assert_eq!(schema["type"], json!("object"));
    assert_eq!(
        schema["properties"]["query"],
        json!({"$ref": "#/$defs/and-or-op"})
    );
    assert_eq!(schema["required"], json!(["query"]));
}

#[test]
fn json_schema_generates_one_definition_per_field() {
    let catalog = participant_catalog();
    let def = participant_set(&catalog);
    let schema = def.json_schema("https://example.org/filters.schema.json", "Participant filters");

    let defs = schema["$defs"].as_object().unwrap();
    assert!(defs.contains_key("and-or-op"));
    assert!(defs.contains_key("not-op"));
    assert!(defs.contains_key("filters"));
    assert!(defs.contains_key("age-filter"));
    assert!(defs.contains_key("sex-filter"));

    // Field definition: a 2-tuple of the field-name constant and a details
    // object constrained to the valid lookup set.
    let age = &defs["age-filter"];
    assert_eq!(age["prefixItems"][0], json!({"const": "age"}));
    assert_eq!(
        age["prefixItems"][1]["properties"]["lookup"]["enum"],
        json!(["gte", "lte"])
    );
    assert_eq!(
        age["prefixItems"][1]["properties"]["value"],
        json!({"type": "string"})
    );
    assert_eq!(age["prefixItems"][1]["required"], json!(["value"]));

    // The union covers every generated field definition.
    assert_eq!(
        defs["filters"]["anyOf"],
        json!([
            {"$ref": "#/$defs/age-filter"},
            {"$ref": "#/$defs/sex-filter"},
        ])
    );
}

#[test]
fn json_schema_fixed_operator_templates() {
    let catalog = participant_catalog();
    let schema = FilterSchemaDef::derive(&catalog, "participant", &FilterScope::AllFields)
        .json_schema("https://example.org/filters.schema.json", "Participant filters");

    let and_or = &schema["$defs"]["and-or-op"];
    assert_eq!(and_or["prefixItems"][0], json!({"enum": ["and", "or"]}));
    assert_eq!(and_or["minItems"], json!(2));
    assert_eq!(and_or["maxItems"], json!(2));

    let not_op = &schema["$defs"]["not-op"];
    assert_eq!(not_op["prefixItems"][0], json!({"const": "not"}));
    assert_eq!(not_op["maxItems"], json!(2));
}

#[test]
fn json_schema_generation_is_deterministic() {
    let catalog = participant_catalog();
    let def = participant_set(&catalog);
    let first = def.json_schema("https://example.org/s.json", "Filters");
    let second = def.json_schema("https://example.org/s.json", "Filters");
    assert_eq!(first, second);
}

// ============================================================================
// Options descriptor
// ============================================================================

#[test]
fn options_descriptor_lists_operators_and_filters() {
    let catalog = participant_catalog();
    let def = participant_set(&catalog);
    let options = def.options(&catalog).unwrap();

    assert_eq!(
        options["operators"],
        json!({
            "and": {"type": "operator", "label": "AND"},
            "or": {"type": "operator", "label": "OR"},
            "not": {"type": "operator", "label": "NOT"},
        })
    );

    let age = &options["filters"]["age"];
    assert_eq!(age["type"], json!("field"));
    assert_eq!(age["field_type"], json!("integer"));
    assert_eq!(age["default_lookup"], json!("gte"));
    assert_eq!(age["label"], json!("Age"));
    assert_eq!(age["description"], json!("Age in years."));
    assert_eq!(age["lookups"]["gte"], json!({"type": "input", "label": ">="}));
    assert_eq!(age["lookups"]["lte"], json!({"type": "input", "label": "<="}));
}

#[test]
fn options_descriptor_resolves_choices_excluding_blank() {
    let catalog = participant_catalog();
    let def = participant_set(&catalog);
    let options = def.options(&catalog).unwrap();

    assert_eq!(
        options["filters"]["sex"]["lookups"]["exact"],
        json!({
            "type": "choice",
            "label": "is",
            "choices": [["m", "Male"], ["f", "Female"]],
        })
    );
}

#[test]
fn options_descriptor_includes_sticky_metadata() {
    let catalog = MemoryCatalog::new()
        .with_field("product", FieldHandle::new("category", "Category"), ["exact"]);
    let category = Filter::new("Category", vec![Lookup::input("exact", "is")])
        .unwrap()
        .with_sticky_value(json!("Kitchen"))
        .with_solvent_value(json!(""));
    let def = FilterSetDef::builder("product")
        .filter("category", category)
        .build(&catalog)
        .unwrap();

    let options = def.options(&catalog).unwrap();
    let category = &options["filters"]["category"];
    assert_eq!(
        category["sticky_default"],
        json!(["category", {"lookup": "exact", "value": "Kitchen"}])
    );
    assert_eq!(category["solvent_value"], json!(""));
}

#[test]
fn unresolvable_choices_abort_options_generation() {
    // A choice lookup on a field the catalog does not expose, with no
    // static choices and no resolver.
    let catalog = MemoryCatalog::new()
        .with_field("product", FieldHandle::new("name", "Name"), ["icontains"]);
    let def = FilterSetDef::builder("product")
        .filter(
            "name",
            Filter::new(
                "Name",
                vec![Lookup::choice("exact", "is", ChoiceSource::FromCatalog)],
            )
            .unwrap(),
        )
        .build(&catalog)
        .unwrap();

    // Simulate a catalog that no longer exposes the field at options time.
    let stale = MemoryCatalog::new();
    let err = def.options(&stale).unwrap_err();
    assert!(matches!(err, ModelError::UnresolvableChoices { .. }));
}
