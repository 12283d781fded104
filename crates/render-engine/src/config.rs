//! Mermaid configuration layering.
//!
//! Each record gets its own configuration value built from, in order:
//! the base theme layer, the operator's JSON overrides, and the record's
//! own options. Later layers win on key collision. `themeCSS` is applied
//! last so the operator's stylesheet always takes effect.

use mmbake_common::config::RenderSettings;
use serde_json::{Map, Value};

/// Shallow-merge `layers` left to right into a new map.
pub fn merge_layers(layers: &[&Map<String, Value>]) -> Map<String, Value> {
    let mut merged = Map::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Base layer derived from the run's theme.
pub fn base_layer(settings: &RenderSettings) -> Map<String, Value> {
    let mut base = Map::new();
    base.insert(
        "theme".to_string(),
        Value::String(settings.theme.as_str().to_string()),
    );
    base.insert("startOnLoad".to_string(), Value::Bool(false));
    base
}

/// Build the configuration passed to `mermaid.initialize` for one record.
pub fn merge_render_config(
    settings: &RenderSettings,
    record_options: &Map<String, Value>,
) -> Map<String, Value> {
    let base = base_layer(settings);
    let mut merged = merge_layers(&[&base, &settings.mermaid_overrides, record_options]);
    merged.insert(
        "themeCSS".to_string(),
        Value::String(settings.theme_css.clone()),
    );
    merged
}
