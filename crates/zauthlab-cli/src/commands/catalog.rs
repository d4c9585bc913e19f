//! `zauthlab catalog` — list the endpoint catalog a run would see.

use zauthlab_core::sim::endpoint_failure_probability;

use super::{load_catalog, write_json};

/// Run the catalog command.
pub fn run(catalog_path: Option<&str>, endpoints_per_category: usize, output_path: Option<&str>) {
    let endpoints = load_catalog(catalog_path, endpoints_per_category);

    println!(
        "{:<16} {:<10} {:>9} {:>10} {:>7} {:>8}",
        "Name", "Category", "Declared", "Requested", "Schema", "SimFail"
    );
    println!("{}", "-".repeat(66));
    for ep in &endpoints {
        let declared = ep
            .declared_price
            .map_or_else(|| "-".to_string(), |p| format!("{p:.3}"));
        let requested = ep
            .requested_price
            .map_or_else(|| "-".to_string(), |p| format!("{p:.3}"));
        let schema = if ep.declared_schema.is_some() { "yes" } else { "-" };
        println!(
            "{:<16} {:<10} {:>9} {:>10} {:>7} {:>7.0}%",
            ep.name,
            ep.category.to_string(),
            declared,
            requested,
            schema,
            endpoint_failure_probability(&ep.name) * 100.0
        );
    }
    println!("\n{} endpoints", endpoints.len());

    if let Some(path) = output_path {
        write_json(path, &endpoints);
    }
}
