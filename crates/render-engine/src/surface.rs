//! Browser and rendering-surface contracts.
//!
//! A [`BrowserHandle`] is the long-lived browser process shared by a whole
//! run. Each definition gets its own [`RenderSurface`] (a page), which is
//! closed once its artifact is extracted.

use mmbake_common::error::{MmbakeError, MmbakeResult};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Region of the page to capture, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ClipRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ClipRegion {
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// A browser process able to open isolated rendering surfaces.
#[async_trait::async_trait]
pub trait BrowserHandle: Send + Sync {
    /// Open a fresh, isolated surface.
    async fn new_surface(&self) -> MmbakeResult<Box<dyn RenderSurface>>;

    /// Tear the browser process down. Safe to call more than once.
    async fn shutdown(&mut self) -> MmbakeResult<()>;
}

/// One page inside the browser, used for exactly one definition.
#[async_trait::async_trait]
pub trait RenderSurface: Send {
    /// Resize the viewport.
    async fn set_viewport(&mut self, width: u32, height: u32) -> MmbakeResult<()>;

    /// Navigate to the harness page.
    async fn load(&mut self, url: &str) -> MmbakeResult<()>;

    /// Paint the page background with a CSS color.
    async fn apply_background(&mut self, color: &str) -> MmbakeResult<()>;

    /// Inject the definition text and run mermaid with `config`.
    async fn populate(&mut self, definition: &str, config: &Map<String, Value>)
        -> MmbakeResult<()>;

    /// Markup currently inside the harness container.
    async fn container_markup(&mut self) -> MmbakeResult<String>;

    /// Bounding box of the rendered diagram.
    async fn diagram_bounds(&mut self) -> MmbakeResult<ClipRegion>;

    /// PNG bytes of `clip`.
    async fn screenshot(&mut self, clip: ClipRegion, omit_background: bool)
        -> MmbakeResult<Vec<u8>>;

    /// PDF bytes of the whole page.
    async fn print_pdf(&mut self, print_background: bool) -> MmbakeResult<Vec<u8>>;

    /// Close the page.
    async fn close(&mut self) -> MmbakeResult<()>;
}

/// Lifecycle of a single surface. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SurfaceState {
    Created,
    Configured,
    Loaded,
    Populated,
    Extracted,
    Released,
}

/// Tracks a surface's [`SurfaceState`] and rejects transitions that would
/// revisit or skip back to an earlier state.
#[derive(Debug, Clone)]
pub struct SurfaceLifecycle {
    state: SurfaceState,
}

impl SurfaceLifecycle {
    pub fn new() -> Self {
        Self {
            state: SurfaceState::Created,
        }
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    pub fn is_released(&self) -> bool {
        self.state == SurfaceState::Released
    }

    /// Move to `next`.
    ///
    /// Rendering steps advance one state at a time; `Released` is reachable
    /// from any live state and is terminal.
    pub fn advance(&mut self, next: SurfaceState) -> MmbakeResult<()> {
        let allowed = match next {
            SurfaceState::Released => self.state != SurfaceState::Released,
            _ => successor(self.state) == Some(next),
        };
        if !allowed {
            return Err(MmbakeError::Other(anyhow::anyhow!(
                "invalid surface transition {:?} -> {:?}",
                self.state,
                next
            )));
        }
        tracing::trace!(from = ?self.state, to = ?next, "Surface transition");
        self.state = next;
        Ok(())
    }
}

impl Default for SurfaceLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

fn successor(state: SurfaceState) -> Option<SurfaceState> {
    match state {
        SurfaceState::Created => Some(SurfaceState::Configured),
        SurfaceState::Configured => Some(SurfaceState::Loaded),
        SurfaceState::Loaded => Some(SurfaceState::Populated),
        SurfaceState::Populated => Some(SurfaceState::Extracted),
        SurfaceState::Extracted => Some(SurfaceState::Released),
        SurfaceState::Released => None,
    }
}
