//! Sequential rendering of a whole scan.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use mmbake_common::error::{MmbakeError, MmbakeResult};
use mmbake_scanner::Definition;

use crate::pipeline::RenderPipeline;
use crate::surface::BrowserHandle;

/// What to do when one definition fails to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run at the first render error.
    #[default]
    Abort,
    /// Record the failure and move on to the next definition.
    Continue,
}

/// A definition that could not be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFailure {
    pub source_file: PathBuf,
    pub message: String,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Definitions whose every artifact was written.
    pub rendered: usize,

    /// Artifacts written, in order.
    pub outputs: Vec<PathBuf>,

    /// Definitions skipped under [`FailurePolicy::Continue`].
    pub failures: Vec<RenderFailure>,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render every definition, strictly one after another.
///
/// All artifacts of one definition are written before the next definition's
/// surface is opened. Scan errors always end the run; render errors end it
/// only under [`FailurePolicy::Abort`]. An empty sequence is a successful run.
pub async fn render_all<I>(
    pipeline: &RenderPipeline,
    browser: &dyn BrowserHandle,
    definitions: I,
    output_dir: &Path,
    policy: FailurePolicy,
) -> MmbakeResult<BatchSummary>
where
    I: IntoIterator<Item = MmbakeResult<Definition>>,
{
    let started = Instant::now();
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| MmbakeError::filesystem(output_dir, e))?;

    let mut summary = BatchSummary::default();
    let mut claimed: HashMap<String, PathBuf> = HashMap::new();

    for definition in definitions {
        let definition = definition?;

        if let Some(previous) = claimed.insert(
            definition.output_name().to_string(),
            definition.source_file().to_path_buf(),
        ) {
            tracing::warn!(
                name = definition.output_name(),
                previous = %previous.display(),
                source = %definition.source_file().display(),
                "Output name already used in this run; artifacts will be overwritten"
            );
        }

        match render_definition(pipeline, browser, &definition, output_dir).await {
            Ok(outputs) => {
                summary.rendered += 1;
                summary.outputs.extend(outputs);
            }
            Err(err) => match policy {
                FailurePolicy::Abort => return Err(err),
                FailurePolicy::Continue => {
                    tracing::warn!(
                        source = %definition.source_file().display(),
                        error = %err,
                        "Skipping definition after render failure"
                    );
                    summary.failures.push(RenderFailure {
                        source_file: definition.source_file().to_path_buf(),
                        message: err.to_string(),
                    });
                }
            },
        }
    }

    tracing::info!(
        rendered = summary.rendered,
        failed = summary.failures.len(),
        outputs = summary.outputs.len(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Batch finished"
    );
    Ok(summary)
}

async fn render_definition(
    pipeline: &RenderPipeline,
    browser: &dyn BrowserHandle,
    definition: &Definition,
    output_dir: &Path,
) -> MmbakeResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for output in pipeline.output_paths(output_dir, definition) {
        tracing::info!(
            output = %output.display(),
            name = definition.output_name(),
            "Render file"
        );
        written.push(pipeline.render(browser, definition, &output).await?);
    }
    Ok(written)
}
