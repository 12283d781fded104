//! The definition record handed from the scanner to the render pipeline.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

/// One diagram to render.
///
/// Created once per discovered diagram and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    source_file: PathBuf,
    output_name: String,
    options: Map<String, Value>,
    text: String,
}

impl Definition {
    /// Build a record for a standalone definition file.
    ///
    /// The output name is the file's base name with its extension stripped.
    pub fn from_file(source_file: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let source_file = source_file.into();
        let output_name = output_name_for(&source_file);
        Self {
            source_file,
            output_name,
            options: Map::new(),
            text: text.into(),
        }
    }

    /// Build a record with an explicit output name and per-record options.
    pub fn new(
        source_file: impl Into<PathBuf>,
        output_name: impl Into<String>,
        options: Map<String, Value>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            output_name: output_name.into(),
            options,
            text: text.into(),
        }
    }

    /// File the definition was read from.
    pub fn source_file(&self) -> &Path {
        &self.source_file
    }

    /// Base name for rendered artifacts.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Mermaid configuration keys that apply to this record only.
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Raw definition text, passed to the renderer verbatim.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Derive the artifact base name from a source path.
pub fn output_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
