//! mmbake Common Utilities
//!
//! Shared infrastructure for all mmbake crates:
//! - Error types and result aliases
//! - Render, browser, and application configuration
//! - Eager loaders for operator-supplied config files
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
