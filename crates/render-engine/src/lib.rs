//! mmbake Render Engine
//!
//! Renders mermaid definitions through a headless Chromium page and writes
//! the resulting artifacts to disk.
//!
//! # Pipeline Architecture
//!
//! ```text
//! Definition ──┐
//!              ├── new surface (one page per record)
//! settings ────┘         │
//!                        ├── viewport ── harness page ── background
//!                        │
//!                        ├── populate (mermaid.initialize + run)
//!                        │
//!                        ├── .svg  container markup
//!                        ├── .png  clipped screenshot
//!                        └── .pdf  document export
//!                                  │
//!                                  ▼
//!                           surface released
//! ```
//!
//! Records are rendered strictly one after another against a single
//! browser process; see [`batch::render_all`].

pub mod batch;
pub mod chromium;
pub mod config;
pub mod harness;
pub mod pipeline;
pub mod surface;

pub use batch::*;
pub use chromium::ChromiumBrowser;
pub use config::merge_render_config;
pub use harness::Harness;
pub use pipeline::*;
pub use surface::*;
