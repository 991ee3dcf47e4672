//! JSON Schema generation for the config file and `--json` output.
//!
//! Schemas are generated with schemars and exported by the `schema`
//! subcommand.

use schemars::{schema::RootSchema, schema_for};
use std::collections::BTreeMap;

/// All available schemas, keyed by name.
/// BTreeMap keeps the output ordering stable.
pub fn all_schemas() -> BTreeMap<&'static str, RootSchema> {
    let mut schemas = BTreeMap::new();

    schemas.insert("config", schema_for!(crate::config::GeneratorConfig));
    schemas.insert(
        "generate",
        schema_for!(crate::cmd::generate::GenerateJsonOutput),
    );

    schemas
}

/// Generate a single schema by name.
pub fn get_schema(name: &str) -> Option<RootSchema> {
    all_schemas().remove(name)
}

/// List all available schema names.
pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names() {
        assert_eq!(schema_names(), vec!["config", "generate"]);
    }

    #[test]
    fn test_config_schema_lists_fields() {
        let schema = get_schema("config").unwrap();
        let json = serde_json::to_value(&schema).unwrap();
        let props = json["properties"].as_object().unwrap();
        for field in ["num_days", "approx_rows_per_day", "output_format", "columns"] {
            assert!(props.contains_key(field), "missing {}", field);
        }
        assert!(get_schema("nope").is_none());
    }
}
