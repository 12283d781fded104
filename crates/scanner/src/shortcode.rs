//! Extraction of Hugo-style mermaid shortcodes from Markdown.
//!
//! ```text
//! {{< mermaid context="login-flow" options='{"theme":"dark"}' >}}
//! sequenceDiagram
//!     Alice->>Bob: hi
//! {{< /mermaid >}}
//! ```
//!
//! `context` names the rendered artifacts, `options` is a JSON object of
//! mermaid configuration for that block alone.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::definition::{output_name_for, Definition};

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\{\{<\s*mermaid\b([^>]*)>\}\}(.*?)\{\{<\s*/mermaid\s*>\}\}")
            .expect("shortcode block pattern is valid")
    })
}

fn context_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"context\s*=\s*"([^"]*)""#).expect("context attribute pattern is valid")
    })
}

fn options_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"options\s*=\s*(?:'([^']*)'|"([^"]*)")"#)
            .expect("options attribute pattern is valid")
    })
}

/// Extract every mermaid block in `content`, in document order.
///
/// Blocks without a `context` attribute are named `<file-stem>-<n>`, counting
/// from 1. Empty blocks are skipped.
pub fn extract_shortcodes(source_file: &Path, content: &str) -> Vec<Definition> {
    let stem = output_name_for(source_file);
    let mut definitions = Vec::new();

    for (index, captures) in block_regex().captures_iter(content).enumerate() {
        let attributes = captures.get(1).map_or("", |m| m.as_str());
        let body = captures.get(2).map_or("", |m| m.as_str()).trim();
        if body.is_empty() {
            tracing::warn!(
                source = %source_file.display(),
                block = index + 1,
                "Skipping empty mermaid shortcode"
            );
            continue;
        }

        let output_name = context_regex()
            .captures(attributes)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("{stem}-{}", index + 1));

        let options = parse_options(source_file, index + 1, attributes);
        definitions.push(Definition::new(source_file, output_name, options, body));
    }

    definitions
}

fn parse_options(source_file: &Path, block: usize, attributes: &str) -> Map<String, Value> {
    let Some(captures) = options_regex().captures(attributes) else {
        return Map::new();
    };
    let raw = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map_or("", |m| m.as_str())
        .replace("&quot;", "\"");
    if raw.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!(
                source = %source_file.display(),
                block,
                "Shortcode options are not a JSON object; ignoring"
            );
            Map::new()
        }
        Err(err) => {
            tracing::warn!(
                source = %source_file.display(),
                block,
                error = %err,
                "Malformed shortcode options; ignoring"
            );
            Map::new()
        }
    }
}
