//! JSON Schema validation for default-map files

use anyhow::{Result, anyhow};
use jsonschema::Validator;
use serde_json::Value;

/// Build a validator from the embedded default-map schema
pub fn get_validator() -> Result<Validator> {
    let schema_str = include_str!("../../docs/default_map.schema.json");
    let schema: Value = serde_json::from_str(schema_str)
        .map_err(|e| anyhow!("Failed to parse embedded JSON schema: {e}"))?;

    jsonschema::draft7::new(&schema).map_err(|e| anyhow!("Failed to compile JSON schema: {e}"))
}

/// Validate a parsed default map against the schema
///
/// Every violation is reported, one per line, with its instance path.
pub fn validate_against_schema(document: &Value) -> Result<()> {
    let validator = get_validator()?;

    let error_messages: Vec<String> = validator
        .iter_errors(document)
        .map(|e| {
            format!(
                "  - Path '{}': {} (schema: {})",
                e.instance_path, e, e.schema_path
            )
        })
        .collect();

    if !error_messages.is_empty() {
        return Err(anyhow!(
            "Default map validation failed:\n{}",
            error_messages.join("\n")
        ));
    }

    Ok(())
}
