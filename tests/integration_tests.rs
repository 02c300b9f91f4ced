//! Workspace-level integration tests: catalog -> filter set -> request
//! validation -> predicate, plus the two schema derivations, exercised
//! together the way an embedding application would.

use serde_json::json;
use sifter_model::{
    ChoiceSource, FieldHandle, Filter, Lookup, MemoryCatalog, Predicate,
};
use sifter_query::{FilterSetDef, QueryNode};

fn market_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_field(
            "product",
            FieldHandle::new("name", "Name").with_field_type("string"),
            ["exact", "icontains"],
        )
        .with_field(
            "product",
            FieldHandle::new("category", "Category").with_choices([
                ("", "---------"),
                ("Kitchen", "Kitchen"),
                ("Tools", "Tools"),
            ]),
            ["exact", "in"],
        )
        .with_field(
            "product",
            FieldHandle::new("stocked", "Stocked").with_field_type("date"),
            ["exact", "year__gte"],
        )
}

fn market_filterset(catalog: &MemoryCatalog) -> FilterSetDef {
    let name = Filter::new("Name", vec![Lookup::input("icontains", "contains")]).unwrap();
    let category = Filter::new(
        "Category",
        vec![Lookup::choice("exact", "is", ChoiceSource::FromCatalog)],
    )
    .unwrap()
    .with_sticky_value(json!("Kitchen"))
    .with_solvent_value(json!(""));
    let stocked = Filter::new(
        "Stocked",
        vec![Lookup::input(
            sifter_model::LookupExpr::chain(["year", "gte"]),
            "year >=",
        )],
    )
    .unwrap();

    FilterSetDef::builder("product")
        .filter("name", name)
        .filter("category", category)
        .filter("stocked", stocked)
        .build(catalog)
        .unwrap()
}

#[test]
fn full_request_flow_produces_a_combined_predicate() {
    let catalog = market_catalog();
    let def = market_filterset(&catalog);

    let raw = json!(["and", [
        ["name", {"value": "pan"}],
        ["stocked", {"lookup": ["year", "gte"], "value": "2020"}],
    ]]);
    let mut query = def.query(raw.clone());
    assert!(query.is_valid().unwrap());

    // The request round-trips through the expression tree unchanged.
    assert_eq!(query.expression().unwrap().to_query_data(), raw);

    // The sticky category default joins the request's own criteria.
    assert_eq!(
        query.predicate().unwrap(),
        Some(Predicate::And {
            children: vec![
                Predicate::And {
                    children: vec![
                        Predicate::compare("name", "icontains", json!("pan")),
                        Predicate::compare("stocked", "year__gte", json!("2020")),
                    ],
                },
                Predicate::compare("category", "exact", json!("Kitchen")),
            ],
        })
    );
}

#[test]
fn invalid_requests_never_reach_predicate_construction() {
    let catalog = market_catalog();
    let def = market_filterset(&catalog);

    let mut query = def.query(json!(["and", [
        ["price", {"lookup": "gte", "value": "10"}],
    ]]));
    assert!(!query.is_valid().unwrap());
    assert_eq!(
        query.errors().get("price"),
        Some(&vec!["invalid filter".to_string()])
    );
    assert!(query.predicate().is_err());
}

#[test]
fn shared_definition_isolates_concurrent_requests() {
    let catalog = market_catalog();
    let def = market_filterset(&catalog);

    let mut good = def.query(json!(["and", [["name", {"value": "pan"}]]]));
    let mut bad = def.query(json!(["and", [["price", {"value": "10"}]]]));

    assert!(!bad.is_valid().unwrap());
    assert!(good.is_valid().unwrap());
    // The failing request's errors are invisible to the valid one.
    assert!(good.errors().is_empty());
    assert!(!bad.errors().is_empty());
}

#[test]
fn both_schema_derivations_come_from_the_same_registry() {
    let catalog = market_catalog();
    let def = market_filterset(&catalog);

    let schema = def.json_schema("https://example.org/product-filters.json", "Product filters");
    let defs = schema["$defs"].as_object().unwrap();
    for field in def.valid_filters().keys() {
        assert!(defs.contains_key(&format!("{field}-filter")), "missing {field}");
    }

    let options = def.options(&catalog).unwrap();
    let filters = options["filters"].as_object().unwrap();
    for field in def.valid_filters().keys() {
        assert!(filters.contains_key(field), "missing {field}");
    }
    assert_eq!(
        options["filters"]["category"]["sticky_default"],
        json!(["category", {"lookup": "exact", "value": "Kitchen"}])
    );
}

#[test]
fn serialized_trees_reparse_across_the_crate_boundary() {
    let data = json!(["or", [
        ["and", [
            ["name", {"lookup": "icontains", "value": "pan"}],
            ["category", {"value": "Tools"}],
        ]],
        ["not", ["stocked", {"lookup": ["year", "gte"], "value": "2020"}]],
    ]]);
    let tree = QueryNode::from_query_data(&data).unwrap();
    assert_eq!(tree.to_query_data(), data);
}
