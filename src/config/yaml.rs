//! Default-map file loading (YAML, or JSON by extension)

use crate::config::DefaultMap;
use crate::system::System;
use anyhow::{Context as _, Result, anyhow};
use std::path::Path;

/// Load, validate and convert a default-map file
///
/// Files ending in `.json` are parsed as JSON; everything else as YAML.
pub fn load_default_map(system: &dyn System, path: &Path) -> Result<DefaultMap> {
    let display = path.display();

    if !system.exists(path) {
        return Err(anyhow!("Default map file not found: {display}"));
    }

    let content = system
        .read_to_string(path)
        .with_context(|| format!("Failed to read default map file: {display}"))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let document: serde_json::Value = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON default map in file: {display}"))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML default map in file: {display}"))?
    };

    crate::config::schema::validate_against_schema(&document)
        .with_context(|| format!("Invalid default map in file: {display}"))?;

    let map = DefaultMap::from_json(&document)?;
    tracing::debug!(
        "Loaded {} default map entries from {}",
        map.len(),
        path.display()
    );
    Ok(map)
}
