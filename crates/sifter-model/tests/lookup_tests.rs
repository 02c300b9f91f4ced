//! Lookup description and choice resolution tests.

use std::sync::Arc;

use serde_json::json;
use sifter_model::{
    ChoiceSource, FieldHandle, Lookup, LookupExpr, ModelError,
};

fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(value, label)| (value.to_string(), label.to_string()))
        .collect()
}

// ============================================================================
// Input lookups
// ============================================================================

#[test]
fn input_lookup_describes_type_and_label() {
    let field = FieldHandle::new("count", "Count");
    let lookup = Lookup::input("gte", ">=");

    let description = lookup.describe(Some(&field)).unwrap();
    assert_eq!(description.kind, "input");
    assert_eq!(description.label, ">=");
    assert_eq!(description.choices, None);
}

#[test]
fn input_lookup_describes_without_a_field() {
    let lookup = Lookup::input("icontains", "contains");
    let description = lookup.describe(None).unwrap();
    assert_eq!(description.kind, "input");
    assert_eq!(description.choices, None);
}

// ============================================================================
// Choice lookups
// ============================================================================

#[test]
fn choice_lookup_uses_static_choices() {
    let lookup = Lookup::choice(
        "exact",
        "is",
        ChoiceSource::Static(pairs(&[("manual", "Manual"), ("bulk", "Bulk")])),
    );

    // Static choices win even when the field carries its own enumeration.
    let field =
        FieldHandle::new("type", "Type").with_choices([("other", "Other")]);
    let description = lookup.describe(Some(&field)).unwrap();
    assert_eq!(
        description.choices,
        Some(pairs(&[("manual", "Manual"), ("bulk", "Bulk")]))
    );
}

#[test]
fn choice_lookup_invokes_resolver_with_lookup_and_field() {
    let lookup = Lookup::choice(
        "exact",
        "is",
        ChoiceSource::Resolver(Arc::new(
            |lookup: &Lookup, field: &FieldHandle| {
                vec![(
                    format!("{}-{}", field.name(), lookup.canonical_name()),
                    "Resolved".to_string(),
                )]
            },
        )),
    );

    let field = FieldHandle::new("continent", "Continent");
    let description = lookup.describe(Some(&field)).unwrap();
    assert_eq!(
        description.choices,
        Some(pairs(&[("continent-exact", "Resolved")]))
    );
}

#[test]
fn choice_lookup_falls_back_to_catalog_choices_excluding_blank() {
    let lookup = Lookup::choice("exact", "is", ChoiceSource::FromCatalog);
    let field = FieldHandle::new("type", "Type").with_choices([
        ("", "---------"),
        ("manual", "Manual"),
        ("bulk", "Bulk"),
    ]);

    let description = lookup.describe(Some(&field)).unwrap();
    assert_eq!(
        description.choices,
        Some(pairs(&[("manual", "Manual"), ("bulk", "Bulk")]))
    );
}

#[test]
fn choice_lookup_without_field_or_choices_is_an_error() {
    let lookup = Lookup::choice("exact", "is", ChoiceSource::FromCatalog);
    let err = lookup.describe(None).unwrap_err();
    assert!(matches!(
        err,
        ModelError::UnresolvableChoices { lookup } if lookup == "exact"
    ));
}

// ============================================================================
// Lookup expressions
// ============================================================================

#[test]
fn lookup_expr_canonical_joins_chain_segments() {
    assert_eq!(LookupExpr::from("exact").canonical(), "exact");
    assert_eq!(LookupExpr::chain(["year", "gte"]).canonical(), "year__gte");
}

#[test]
fn lookup_expr_preserves_wire_form() {
    let name: LookupExpr = serde_json::from_value(json!("exact")).unwrap();
    assert_eq!(name, LookupExpr::Name("exact".to_string()));
    assert_eq!(serde_json::to_value(&name).unwrap(), json!("exact"));

    let chain: LookupExpr = serde_json::from_value(json!(["year", "gte"])).unwrap();
    assert_eq!(chain, LookupExpr::chain(["year", "gte"]));
    assert_eq!(serde_json::to_value(&chain).unwrap(), json!(["year", "gte"]));
}
