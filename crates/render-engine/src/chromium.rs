//! Chromium backend built on `chromiumoxide`.
//!
//! In-page work is expressed as small async scripts that always resolve to
//! an envelope `{ ok, error, value }`, so a failure inside mermaid comes
//! back as a readable message instead of a bare protocol exception.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, PrintToPdfParams, Viewport,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use mmbake_common::config::BrowserLaunchConfig;
use mmbake_common::error::{MmbakeError, MmbakeResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::surface::{BrowserHandle, ClipRegion, RenderSurface};

/// A Chromium process driven over the DevTools protocol.
pub struct ChromiumBrowser {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
    closed: bool,
}

impl ChromiumBrowser {
    /// Launch a browser process with the given settings.
    pub async fn launch(config: &BrowserLaunchConfig) -> MmbakeResult<Self> {
        let mut builder = BrowserConfig::builder();
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if !config.args.is_empty() {
            builder = builder.args(config.args.clone());
        }
        if let Some(timeout) = config.timeout() {
            builder = builder.request_timeout(timeout);
        }
        let browser_config = builder
            .build()
            .map_err(|e| MmbakeError::browser(format!("Invalid browser configuration: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| MmbakeError::browser(format!("Failed to launch browser: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "Browser connection event failed");
                }
            }
        });

        tracing::info!(
            executable = ?config.executable_path,
            headless = config.headless,
            "Browser launched"
        );

        Ok(Self {
            browser,
            handler: Some(handler),
            closed: false,
        })
    }
}

#[async_trait::async_trait]
impl BrowserHandle for ChromiumBrowser {
    async fn new_surface(&self) -> MmbakeResult<Box<dyn RenderSurface>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| MmbakeError::browser(format!("Failed to open page: {e}")))?;
        Ok(Box::new(ChromiumSurface { page: Some(page) }))
    }

    async fn shutdown(&mut self) -> MmbakeResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self.browser.close().await;
        let waited = self.browser.wait().await;
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        closed.map_err(|e| MmbakeError::browser(format!("Failed to close browser: {e}")))?;
        waited.map_err(|e| MmbakeError::browser(format!("Browser did not exit cleanly: {e}")))?;

        tracing::info!("Browser closed");
        Ok(())
    }
}

/// One Chromium page.
pub struct ChromiumSurface {
    page: Option<Page>,
}

impl ChromiumSurface {
    fn page(&self) -> MmbakeResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| MmbakeError::browser("Surface already closed"))
    }

    async fn evaluate(&self, script: String) -> MmbakeResult<Value> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| MmbakeError::browser(format!("Invalid evaluation: {e}")))?;
        let result = self
            .page()?
            .evaluate_expression(params)
            .await
            .map_err(|e| MmbakeError::browser(format!("Script evaluation failed: {e}")))?;
        let value = result.value().cloned().unwrap_or(Value::Null);
        open_envelope(value)
    }
}

#[async_trait::async_trait]
impl RenderSurface for ChromiumSurface {
    async fn set_viewport(&mut self, width: u32, height: u32) -> MmbakeResult<()> {
        let params =
            SetDeviceMetricsOverrideParams::new(i64::from(width), i64::from(height), 1.0, false);
        self.page()?
            .execute(params)
            .await
            .map_err(|e| MmbakeError::browser(format!("Failed to set viewport: {e}")))?;
        Ok(())
    }

    async fn load(&mut self, url: &str) -> MmbakeResult<()> {
        self.page()?
            .goto(url)
            .await
            .map_err(|e| MmbakeError::browser(format!("Failed to load harness page: {e}")))?;
        Ok(())
    }

    async fn apply_background(&mut self, color: &str) -> MmbakeResult<()> {
        self.evaluate(scripts::apply_background(color)).await?;
        Ok(())
    }

    async fn populate(
        &mut self,
        definition: &str,
        config: &Map<String, Value>,
    ) -> MmbakeResult<()> {
        self.evaluate(scripts::populate(definition, config)).await?;
        Ok(())
    }

    async fn container_markup(&mut self) -> MmbakeResult<String> {
        match self.evaluate(scripts::container_markup()).await? {
            Value::String(markup) => Ok(markup),
            other => Err(MmbakeError::browser(format!(
                "Container markup was not a string: {other}"
            ))),
        }
    }

    async fn diagram_bounds(&mut self) -> MmbakeResult<ClipRegion> {
        let value = self.evaluate(scripts::diagram_bounds()).await?;
        serde_json::from_value(value)
            .map_err(|e| MmbakeError::browser(format!("Unexpected diagram bounds: {e}")))
    }

    async fn screenshot(
        &mut self,
        clip: ClipRegion,
        omit_background: bool,
    ) -> MmbakeResult<Vec<u8>> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(Viewport {
                x: clip.x,
                y: clip.y,
                width: clip.width,
                height: clip.height,
                scale: 1.0,
            })
            .omit_background(omit_background)
            .build();
        self.page()?
            .screenshot(params)
            .await
            .map_err(|e| MmbakeError::browser(format!("Screenshot failed: {e}")))
    }

    async fn print_pdf(&mut self, print_background: bool) -> MmbakeResult<Vec<u8>> {
        let params = PrintToPdfParams {
            print_background: Some(print_background),
            ..Default::default()
        };
        self.page()?
            .pdf(params)
            .await
            .map_err(|e| MmbakeError::browser(format!("PDF export failed: {e}")))
    }

    async fn close(&mut self) -> MmbakeResult<()> {
        if let Some(page) = self.page.take() {
            page.close()
                .await
                .map_err(|e| MmbakeError::browser(format!("Failed to close page: {e}")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    value: Value,
}

/// Unwrap the `{ ok, error, value }` object every page script resolves to.
fn open_envelope(raw: Value) -> MmbakeResult<Value> {
    let envelope: Envelope = serde_json::from_value(raw)
        .map_err(|e| MmbakeError::browser(format!("Malformed page response: {e}")))?;
    if envelope.ok {
        Ok(envelope.value)
    } else {
        Err(MmbakeError::browser(
            envelope
                .error
                .unwrap_or_else(|| "page script failed without a message".to_string()),
        ))
    }
}

mod scripts {
    use serde_json::{Map, Value};

    fn literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
    }

    pub(super) fn apply_background(color: &str) -> String {
        format!(
            "(() => {{ document.body.style.background = {}; return {{ ok: true }}; }})()",
            literal(color)
        )
    }

    pub(super) fn populate(definition: &str, config: &Map<String, Value>) -> String {
        format!(
            r#"(async () => {{
  const container = document.getElementById('container');
  if (!container) return {{ ok: false, error: 'harness container #container is missing' }};
  if (!window.mermaid) return {{ ok: false, error: 'mermaid library not loaded' }};
  try {{
    container.textContent = {definition};
    window.mermaid.initialize({config});
    if (typeof window.mermaid.run === 'function') {{
      await window.mermaid.run({{ nodes: [container], suppressErrors: false }});
    }} else {{
      await window.mermaid.init(undefined, container);
    }}
    return {{ ok: true }};
  }} catch (e) {{
    return {{ ok: false, error: String(e && e.message ? e.message : e) }};
  }}
}})()"#,
            definition = literal(definition),
            config = literal(config),
        )
    }

    pub(super) fn container_markup() -> String {
        r#"(() => {
  const container = document.getElementById('container');
  if (!container) return { ok: false, error: 'harness container #container is missing' };
  return { ok: true, value: container.innerHTML };
})()"#
            .to_string()
    }

    pub(super) fn diagram_bounds() -> String {
        r#"(() => {
  const svg = document.querySelector('#container svg');
  if (!svg) return { ok: false, error: 'no rendered svg in container' };
  const rect = svg.getBoundingClientRect();
  return { ok: true, value: { x: rect.left, y: rect.top, width: rect.width, height: rect.height } };
})()"#
            .to_string()
    }
}
