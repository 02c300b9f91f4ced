//! End-to-end demo: declare a product filter set, validate a request, and
//! print the resulting predicate plus both generated schema documents.
//!
//! Run with: `cargo run --example product_filtering`

use anyhow::Result;
use serde_json::json;
use sifter_model::{ChoiceSource, FieldHandle, Filter, Lookup, MemoryCatalog};
use sifter_query::FilterSetDef;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let catalog = MemoryCatalog::new()
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
            ["exact"],
        );

    let def = FilterSetDef::builder("product")
        .filter(
            "name",
            Filter::new("Name", vec![Lookup::input("icontains", "contains")])?,
        )
        .filter(
            "category",
            Filter::new(
                "Category",
                vec![Lookup::choice("exact", "is", ChoiceSource::FromCatalog)],
            )?
            .with_sticky_value(json!("Kitchen"))
            .with_solvent_value(json!("")),
        )
        .build(&catalog)?;

    let raw = json!(["and", [["name", {"value": "pan"}]]]);
    let mut query = def.query(raw);
    if query.is_valid()? {
        println!(
            "predicate: {}",
            serde_json::to_string_pretty(&query.predicate()?)?
        );
    } else {
        println!("errors: {:?}", query.errors());
    }

    println!(
        "json schema: {}",
        serde_json::to_string_pretty(&def.json_schema(
            "https://example.org/product-filters.schema.json",
            "Product filters",
        ))?
    );
    println!(
        "options: {}",
        serde_json::to_string_pretty(&def.options(&catalog)?)?
    );

    Ok(())
}
