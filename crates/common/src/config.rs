//! Application configuration.
//!
//! Three sources feed a run: built-in defaults, the optional user config
//! file (`$XDG_CONFIG_HOME/mmbake/config.json`), and command-line flags.
//! Operator-supplied files named on the command line (mermaid config JSON,
//! CSS, browser launch JSON) are loaded eagerly through [`load_json_object`]
//! and [`load_text_file`] so that a missing file fails before any browser
//! process exists.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{MmbakeError, MmbakeResult};

/// Background sentinel meaning "omit the background".
pub const TRANSPARENT: &str = "transparent";

/// Mermaid bundle loaded by the harness page when none is configured.
pub const DEFAULT_MERMAID_SCRIPT: &str =
    "https://cdn.jsdelivr.net/npm/mermaid@10.9.1/dist/mermaid.min.js";

/// Stylesheet applied to every diagram unless a CSS file is supplied.
pub const DEFAULT_THEME_CSS: &str = ".node rect, rect.actor, .node polygon, polygon.labelBox, line.loopLine { fill: #ff8a65; stroke: #ff8a65; } text.actor, text.labelText>tspan {fill: white;font-size: large;} .label { color: white; } .edgeLabel { color: black; background-color: white; font-size: small } .label foreignObject { overflow: visible; }";

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Where definitions are discovered and outputs written.
    pub scan: ScanDefaults,

    /// Render settings applied to every definition.
    pub render: RenderSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default input/output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanDefaults {
    /// Root directory searched for definition files.
    pub input_dir: PathBuf,

    /// Directory receiving rendered artifacts.
    pub output_dir: PathBuf,

    /// Definition file suffix, without the dot.
    pub extension: String,
}

/// Mermaid theme name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Forest,
    Dark,
    Neutral,
}

/// Page background requested for raster and document output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Background {
    /// Omit the background entirely.
    #[default]
    Transparent,
    /// Any CSS color string.
    Color(String),
}

/// Artifact format, chosen by output file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Container markup written verbatim.
    Svg,
    /// Clipped screenshot of the diagram bounds.
    Png,
    /// Paginated document export.
    Pdf,
}

/// Settings that shape every render in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub theme: Theme,

    /// Viewport width in pixels.
    pub width: u32,

    /// Viewport height in pixels.
    pub height: u32,

    pub background: Background,

    /// Stylesheet injected as mermaid `themeCSS`.
    pub theme_css: String,

    /// Keys merged over the base mermaid configuration.
    pub mermaid_overrides: Map<String, Value>,

    /// URL or local path of the mermaid bundle.
    pub mermaid_script: String,

    /// Artifacts produced per definition, in order.
    pub formats: Vec<OutputFormat>,
}

/// Browser launch configuration, read from a JSON file with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BrowserLaunchConfig {
    /// Chrome/Chromium binary; autodetected when absent.
    pub executable_path: Option<PathBuf>,

    /// Run without a visible window.
    pub headless: bool,

    /// Keep the Chromium sandbox enabled.
    pub sandbox: bool,

    /// Extra command-line switches passed to the browser.
    pub args: Vec<String>,

    /// Per-command timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "mmbake=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ScanDefaults {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("diagrams"),
            output_dir: PathBuf::from("."),
            extension: "mermaid".to_string(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            width: 800,
            height: 600,
            background: Background::default(),
            theme_css: DEFAULT_THEME_CSS.to_string(),
            mermaid_overrides: Map::new(),
            mermaid_script: DEFAULT_MERMAID_SCRIPT.to_string(),
            formats: vec![OutputFormat::Svg, OutputFormat::Png],
        }
    }
}

impl Default for BrowserLaunchConfig {
    fn default() -> Self {
        Self {
            executable_path: None,
            headless: true,
            sandbox: true,
            args: Vec::new(),
            timeout_ms: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from `path`, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }
}

impl RenderSettings {
    /// Validate invariants that flags and config files cannot express.
    pub fn validate(&self) -> MmbakeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MmbakeError::config(format!(
                "Viewport must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.formats.is_empty() {
            return Err(MmbakeError::config("At least one output format is required"));
        }
        if self.mermaid_script.trim().is_empty() {
            return Err(MmbakeError::config("Mermaid script location is empty"));
        }
        Ok(())
    }
}

impl BrowserLaunchConfig {
    /// Load launch settings from a JSON file.
    pub fn load(path: &Path) -> MmbakeResult<Self> {
        let object = load_json_object(path)?;
        let ignored = Self::ignored_keys(&object);
        if !ignored.is_empty() {
            tracing::warn!(
                path = %path.display(),
                keys = ?ignored,
                "Ignoring unsupported browser configuration keys"
            );
        }
        serde_json::from_value(Value::Object(object)).map_err(|e| {
            MmbakeError::config(format!(
                "Invalid browser configuration in {}: {e}",
                path.display()
            ))
        })
    }

    /// Keys of `object` this configuration does not understand, sorted.
    pub fn ignored_keys(object: &Map<String, Value>) -> Vec<String> {
        const KNOWN: &[&str] = &["executablePath", "headless", "sandbox", "args", "timeoutMs"];
        let mut ignored: Vec<String> = object
            .keys()
            .filter(|key| !KNOWN.contains(&key.as_str()))
            .cloned()
            .collect();
        ignored.sort();
        ignored
    }

    /// Per-command timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Forest => "forest",
            Self::Dark => "dark",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "forest" => Ok(Self::Forest),
            "dark" => Ok(Self::Dark),
            "neutral" => Ok(Self::Neutral),
            other => Err(format!(
                "unknown theme '{other}', expected one of: default, forest, dark, neutral"
            )),
        }
    }
}

impl Background {
    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Transparent)
    }

    /// CSS color to paint, or `None` for the transparent sentinel.
    pub fn css_color(&self) -> Option<&str> {
        match self {
            Self::Transparent => None,
            Self::Color(color) => Some(color),
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transparent => f.write_str(TRANSPARENT),
            Self::Color(color) => f.write_str(color),
        }
    }
}

impl FromStr for Background {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("background color must not be empty".to_string());
        }
        if trimmed.eq_ignore_ascii_case(TRANSPARENT) {
            Ok(Self::Transparent)
        } else {
            Ok(Self::Color(trimmed.to_string()))
        }
    }
}

impl TryFrom<String> for Background {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Background> for String {
    fn from(value: Background) -> Self {
        value.to_string()
    }
}

impl OutputFormat {
    /// Select the format for an output path: `svg`, `png`, anything else is a document.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("svg") => Self::Svg,
            Some("png") => Self::Png,
            _ => Self::Pdf,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "svg" => Ok(Self::Svg),
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unknown format '{other}', expected svg, png or pdf")),
        }
    }
}

/// Read a JSON file whose top level must be an object.
pub fn load_json_object(path: &Path) -> MmbakeResult<Map<String, Value>> {
    let content = load_text_file(path)?;
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MmbakeError::config(format!(
            "{} must contain a JSON object, found {}",
            path.display(),
            json_kind(&other)
        ))),
        Err(e) => Err(MmbakeError::config(format!(
            "Failed to parse {}: {e}",
            path.display()
        ))),
    }
}

/// Read an operator-supplied text file, distinguishing "missing" from "unreadable".
pub fn load_text_file(path: &Path) -> MmbakeResult<String> {
    if !path.exists() {
        return Err(MmbakeError::ConfigFileMissing {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path)
        .map_err(|e| MmbakeError::config(format!("Failed to read {}: {e}", path.display())))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("mmbake").join("config.json")
}
