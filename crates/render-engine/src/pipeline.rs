//! Rendering of a single definition into a single artifact.

use std::path::{Path, PathBuf};
use std::time::Instant;

use mmbake_common::config::{OutputFormat, RenderSettings};
use mmbake_common::error::{MmbakeError, MmbakeResult};
use mmbake_scanner::Definition;

use crate::config::merge_render_config;
use crate::harness::Harness;
use crate::surface::{BrowserHandle, RenderSurface, SurfaceLifecycle, SurfaceState};

/// Renders definitions against a shared browser, one surface per call.
#[derive(Debug)]
pub struct RenderPipeline {
    settings: RenderSettings,
    harness: Harness,
}

impl RenderPipeline {
    pub fn new(settings: RenderSettings, harness: Harness) -> MmbakeResult<Self> {
        settings.validate()?;
        Ok(Self { settings, harness })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// Artifact paths for `definition`, one per configured format.
    pub fn output_paths(&self, output_dir: &Path, definition: &Definition) -> Vec<PathBuf> {
        output_paths(output_dir, definition, &self.settings.formats)
    }

    /// Render `definition` into `output`; the format follows the path suffix.
    ///
    /// The surface opened for this call is closed on every exit path. Any
    /// failure is returned as a render error naming the definition's source
    /// file; the caller decides whether the run continues.
    pub async fn render(
        &self,
        browser: &dyn BrowserHandle,
        definition: &Definition,
        output: &Path,
    ) -> MmbakeResult<PathBuf> {
        let source = definition.source_file();
        let format = OutputFormat::from_path(output);
        let started = Instant::now();

        tracing::debug!(
            source = %source.display(),
            output = %output.display(),
            ?format,
            "Rendering definition"
        );

        let surface = browser
            .new_surface()
            .await
            .map_err(|e| e.for_source(source))?;
        let mut surface = ScopedSurface::new(surface);

        let outcome = self.drive(&mut surface, definition, output, format).await;

        if let Err(err) = surface.release().await {
            tracing::warn!(
                source = %source.display(),
                error = %err,
                "Failed to close rendering surface"
            );
        }

        let bytes = outcome.map_err(|e| e.for_source(source))?;
        tracing::info!(
            source = %source.display(),
            output = %output.display(),
            bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rendered"
        );
        Ok(output.to_path_buf())
    }

    async fn drive(
        &self,
        surface: &mut ScopedSurface,
        definition: &Definition,
        output: &Path,
        format: OutputFormat,
    ) -> MmbakeResult<usize> {
        let settings = &self.settings;

        surface
            .inner
            .set_viewport(settings.width, settings.height)
            .await?;
        surface.lifecycle.advance(SurfaceState::Configured)?;

        surface.inner.load(self.harness.url()).await?;
        if let Some(color) = settings.background.css_color() {
            surface.inner.apply_background(color).await?;
        }
        surface.lifecycle.advance(SurfaceState::Loaded)?;

        let config = merge_render_config(settings, definition.options());
        surface.inner.populate(definition.text(), &config).await?;
        surface.lifecycle.advance(SurfaceState::Populated)?;

        let transparent = settings.background.is_transparent();
        let bytes = match format {
            OutputFormat::Svg => {
                let markup = surface.inner.container_markup().await?;
                if !markup.contains("<svg") {
                    return Err(MmbakeError::render(
                        definition.source_file(),
                        "diagram produced no svg output",
                    ));
                }
                markup.into_bytes()
            }
            OutputFormat::Png => {
                let clip = surface.inner.diagram_bounds().await?;
                if clip.is_empty() {
                    return Err(MmbakeError::render(
                        definition.source_file(),
                        format!("diagram has empty bounds {}x{}", clip.width, clip.height),
                    ));
                }
                surface.inner.screenshot(clip, transparent).await?
            }
            OutputFormat::Pdf => surface.inner.print_pdf(!transparent).await?,
        };

        tokio::fs::write(output, &bytes)
            .await
            .map_err(|e| MmbakeError::filesystem(output, e))?;
        surface.lifecycle.advance(SurfaceState::Extracted)?;

        Ok(bytes.len())
    }
}

/// Artifact paths `<dir>/<output_name>.<ext>` for each format, in order.
pub fn output_paths(
    output_dir: &Path,
    definition: &Definition,
    formats: &[OutputFormat],
) -> Vec<PathBuf> {
    formats
        .iter()
        .map(|format| {
            output_dir.join(format!(
                "{}.{}",
                definition.output_name(),
                format.extension()
            ))
        })
        .collect()
}

/// A surface paired with its lifecycle, released exactly once.
struct ScopedSurface {
    inner: Box<dyn RenderSurface>,
    lifecycle: SurfaceLifecycle,
}

impl ScopedSurface {
    fn new(inner: Box<dyn RenderSurface>) -> Self {
        Self {
            inner,
            lifecycle: SurfaceLifecycle::new(),
        }
    }

    async fn release(&mut self) -> MmbakeResult<()> {
        if self.lifecycle.is_released() {
            return Ok(());
        }
        self.lifecycle.advance(SurfaceState::Released)?;
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_paths_follow_format_order() {
        let def = Definition::from_file("diagrams/a.mermaid", "graph TD; A-->B");
        let paths = output_paths(
            Path::new("out"),
            &def,
            &[OutputFormat::Svg, OutputFormat::Png, OutputFormat::Pdf],
        );
        assert_eq!(
            paths,
            vec![
                PathBuf::from("out/a.svg"),
                PathBuf::from("out/a.png"),
                PathBuf::from("out/a.pdf"),
            ]
        );
    }

    #[test]
    fn pipeline_rejects_invalid_settings() {
        let harness = Harness::prepare("https://cdn.example.com/mermaid.min.js").unwrap();
        let settings = RenderSettings {
            formats: Vec::new(),
            ..RenderSettings::default()
        };
        assert!(RenderPipeline::new(settings, harness).is_err());
    }
}
