//! Error types shared across mmbake crates.

use std::path::{Path, PathBuf};

/// Top-level error type for mmbake operations.
#[derive(Debug, thiserror::Error)]
pub enum MmbakeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Configuration file \"{}\" doesn't exist", path.display())]
    ConfigFileMissing { path: PathBuf },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Render error in {}: {message}", source_file.display())]
    Render {
        source_file: PathBuf,
        message: String,
    },

    #[error("Browser error: {message}")]
    Browser { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using MmbakeError.
pub type MmbakeResult<T> = Result<T, MmbakeError>;

impl MmbakeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn render(source_file: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Render {
            source_file: source_file.into(),
            message: msg.into(),
        }
    }

    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser {
            message: msg.into(),
        }
    }

    /// Re-attribute any error to the definition whose render produced it.
    ///
    /// Errors that already name a source file are returned unchanged.
    pub fn for_source(self, source_file: &Path) -> Self {
        match self {
            Self::Render { .. } => self,
            other => Self::render(source_file, other.to_string()),
        }
    }

    /// The definition file this error is attributed to, if any.
    pub fn source_file(&self) -> Option<&Path> {
        match self {
            Self::Render { source_file, .. } => Some(source_file),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_names_source_file() {
        let err = MmbakeError::render("diagrams/a.mermaid", "layout failed");
        assert_eq!(
            err.to_string(),
            "Render error in diagrams/a.mermaid: layout failed"
        );
        assert_eq!(err.source_file(), Some(Path::new("diagrams/a.mermaid")));
    }

    #[test]
    fn for_source_wraps_foreign_errors() {
        let err = MmbakeError::browser("target closed").for_source(Path::new("x.mermaid"));
        match err {
            MmbakeError::Render {
                source_file,
                message,
            } => {
                assert_eq!(source_file, PathBuf::from("x.mermaid"));
                assert!(message.contains("target closed"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn for_source_keeps_existing_attribution() {
        let err = MmbakeError::render("first.mermaid", "boom").for_source(Path::new("second.mermaid"));
        assert_eq!(err.source_file(), Some(Path::new("first.mermaid")));
    }

    #[test]
    fn missing_config_message_matches_operator_wording() {
        let err = MmbakeError::ConfigFileMissing {
            path: PathBuf::from("mermaid.json"),
        };
        assert_eq!(
            err.to_string(),
            "Configuration file \"mermaid.json\" doesn't exist"
        );
    }
}
