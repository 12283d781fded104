//! The static page every surface loads before rendering.
//!
//! The page ships inside the binary and is written to a temporary
//! directory once per run, with the mermaid bundle reference filled in.
//! It exposes a single `#container` element and the global `mermaid`
//! handle once the bundle has loaded.

use std::fs;
use std::path::{Path, PathBuf};

use mmbake_common::error::{MmbakeError, MmbakeResult};
use tempfile::TempDir;
use url::Url;

const HARNESS_TEMPLATE: &str = include_str!("../assets/harness.html");
const SCRIPT_PLACEHOLDER: &str = "{{MERMAID_SCRIPT}}";

/// A materialised harness page. The directory is removed on drop.
#[derive(Debug)]
pub struct Harness {
    dir: TempDir,
    url: String,
    script_src: String,
}

impl Harness {
    /// Write the harness page, pointing it at `mermaid_script`.
    ///
    /// `mermaid_script` is either a URL (`http`, `https`, `file`) or a path
    /// to a local bundle, which must exist.
    pub fn prepare(mermaid_script: &str) -> MmbakeResult<Self> {
        let script_src = resolve_script(mermaid_script)?;

        let dir = tempfile::Builder::new()
            .prefix("mmbake-harness-")
            .tempdir()
            .map_err(|e| MmbakeError::browser(format!("Failed to create harness directory: {e}")))?;
        let page_path = dir.path().join("index.html");
        fs::write(&page_path, render_page(&script_src))
            .map_err(|e| MmbakeError::filesystem(&page_path, e))?;

        let url = file_url(&page_path)?;
        tracing::debug!(url = %url, script = %script_src, "Prepared harness page");

        Ok(Self {
            dir,
            url,
            script_src,
        })
    }

    /// `file://` URL of the harness page.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Resolved `src` of the mermaid script tag.
    pub fn script_src(&self) -> &str {
        &self.script_src
    }

    /// Directory holding the page.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

fn render_page(script_src: &str) -> String {
    HARNESS_TEMPLATE.replace(SCRIPT_PLACEHOLDER, &escape_attribute(script_src))
}

fn resolve_script(location: &str) -> MmbakeResult<String> {
    let trimmed = location.trim();
    if ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| trimmed.starts_with(scheme))
    {
        return Ok(trimmed.to_string());
    }

    let path = PathBuf::from(trimmed);
    if !path.exists() {
        return Err(MmbakeError::ConfigFileMissing { path });
    }
    let absolute = fs::canonicalize(&path).map_err(|e| MmbakeError::filesystem(&path, e))?;
    file_url(&absolute)
}

fn file_url(path: &Path) -> MmbakeResult<String> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|()| MmbakeError::config(format!("Cannot express {} as a URL", path.display())))
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
