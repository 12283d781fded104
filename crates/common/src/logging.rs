//! Logging and tracing initialization.
//!
//! Logs always go to stderr; stdout is reserved for command output.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Directives appended to the configured level. The CDP client logs every
/// protocol message it cannot decode at error level.
const DEPENDENCY_DIRECTIVES: &[(&str, &str)] = &[("chromiumoxide", "off"), ("tungstenite", "warn")];

/// Filter directives for `level`, with noisy dependencies silenced unless
/// `level` already mentions them.
pub fn filter_directives(level: &str) -> String {
    let mut directives = level.trim().to_string();
    for (target, setting) in DEPENDENCY_DIRECTIVES {
        if directives.contains(target) {
            continue;
        }
        if !directives.is_empty() {
            directives.push(',');
        }
        directives.push_str(&format!("{target}={setting}"));
    }
    directives
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Calling this twice is harmless; the second subscriber is dropped.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    let installed = if config.json {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init()
    };

    if installed.is_ok() {
        tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    }
}
