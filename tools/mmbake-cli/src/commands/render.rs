//! Render every definition under the input directory.

use std::path::PathBuf;

use clap::Args;
use mmbake_common::config::{
    load_json_object, load_text_file, AppConfig, Background, BrowserLaunchConfig, OutputFormat,
    RenderSettings, Theme,
};
use mmbake_common::error::MmbakeResult;
use mmbake_render_engine::{
    render_all, BrowserHandle, ChromiumBrowser, FailurePolicy, Harness, RenderPipeline,
};
use mmbake_scanner::{DefinitionScanner, ScanOptions};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Directory searched for definitions [default: ./diagrams]
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Directory receiving rendered files [default: .]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Theme of the chart: default, forest, dark or neutral
    #[arg(short, long)]
    pub theme: Option<Theme>,

    /// Width of the page in pixels [default: 800]
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Height of the page in pixels [default: 600]
    #[arg(short = 'H', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: Option<u32>,

    /// Background color, e.g. transparent, red, '#F0F0F0' [default: transparent]
    #[arg(short, long = "background-color")]
    pub background: Option<Background>,

    /// JSON configuration file for mermaid
    #[arg(short, long)]
    pub config_file: Option<PathBuf>,

    /// CSS file applied to diagrams
    #[arg(short = 'C', long)]
    pub css_file: Option<PathBuf>,

    /// JSON configuration file for the browser launch
    #[arg(short = 'p', long)]
    pub browser_config_file: Option<PathBuf>,

    /// URL or local path of the mermaid bundle
    #[arg(long)]
    pub mermaid_script: Option<String>,

    /// Output formats, comma separated [default: svg,png]
    #[arg(long, value_delimiter = ',')]
    pub format: Vec<OutputFormat>,

    /// Definition file suffix, without the dot [default: mermaid]
    #[arg(long)]
    pub extension: Option<String>,

    /// Also extract mermaid shortcodes from Markdown files
    #[arg(long)]
    pub shortcodes: bool,

    /// Continue with the next definition when one fails
    #[arg(long)]
    pub keep_going: bool,
}

/// Everything a run needs, resolved before the browser starts.
#[derive(Debug)]
struct RunPlan {
    input_dir: PathBuf,
    output_dir: PathBuf,
    scan: ScanOptions,
    settings: RenderSettings,
    browser: BrowserLaunchConfig,
    policy: FailurePolicy,
}

/// Merge flags over the loaded config and read every operator-supplied file.
fn plan(args: RenderArgs, config: AppConfig) -> MmbakeResult<RunPlan> {
    let AppConfig { scan, render, .. } = config;
    let mut settings = render;

    if let Some(theme) = args.theme {
        settings.theme = theme;
    }
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(background) = args.background {
        settings.background = background;
    }
    if let Some(script) = args.mermaid_script {
        settings.mermaid_script = script;
    }
    if !args.format.is_empty() {
        settings.formats = args.format;
    }
    if let Some(path) = &args.config_file {
        let overrides = load_json_object(path)?;
        settings.mermaid_overrides.extend(overrides);
    }
    if let Some(path) = &args.css_file {
        settings.theme_css = load_text_file(path)?;
    }
    settings.validate()?;

    let browser = match &args.browser_config_file {
        Some(path) => BrowserLaunchConfig::load(path)?,
        None => BrowserLaunchConfig::default(),
    };

    Ok(RunPlan {
        input_dir: args.input.unwrap_or(scan.input_dir),
        output_dir: args.output.unwrap_or(scan.output_dir),
        scan: ScanOptions {
            extension: args.extension.unwrap_or(scan.extension),
            shortcodes: args.shortcodes,
        },
        settings,
        browser,
        policy: if args.keep_going {
            FailurePolicy::Continue
        } else {
            FailurePolicy::Abort
        },
    })
}

pub async fn run(args: RenderArgs, config: AppConfig) -> anyhow::Result<()> {
    let plan = plan(args, config)?;
    let harness = Harness::prepare(&plan.settings.mermaid_script)?;

    let mut definitions = DefinitionScanner::new(&plan.input_dir, plan.scan.clone())?.peekable();
    if definitions.peek().is_none() {
        println!(
            "No definitions found under {}; nothing to render.",
            plan.input_dir.display()
        );
        return Ok(());
    }

    println!("Rendering definitions from: {}", plan.input_dir.display());
    println!("  Output: {}", plan.output_dir.display());
    println!(
        "  Theme: {}  Viewport: {}x{}  Background: {}",
        plan.settings.theme, plan.settings.width, plan.settings.height, plan.settings.background
    );

    let pipeline = RenderPipeline::new(plan.settings, harness)?;
    let mut browser = ChromiumBrowser::launch(&plan.browser).await?;

    let outcome = render_all(
        &pipeline,
        &browser,
        definitions,
        &plan.output_dir,
        plan.policy,
    )
    .await;

    if let Err(err) = browser.shutdown().await {
        tracing::warn!(error = %err, "Browser shutdown failed");
    }

    let summary = outcome?;
    for output in &summary.outputs {
        println!("  wrote {}", output.display());
    }
    println!("\nRendered {} definition(s).", summary.rendered);

    if !summary.is_success() {
        println!("\n{} definition(s) failed:", summary.failures.len());
        for failure in &summary.failures {
            println!("  - {}: {}", failure.source_file.display(), failure.message);
        }
        anyhow::bail!("{} definition(s) failed to render", summary.failures.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmbake_common::error::MmbakeError;
    use serde_json::json;

    fn args() -> RenderArgs {
        RenderArgs {
            input: None,
            output: None,
            theme: None,
            width: None,
            height: None,
            background: None,
            config_file: None,
            css_file: None,
            browser_config_file: None,
            mermaid_script: None,
            format: Vec::new(),
            extension: None,
            shortcodes: false,
            keep_going: false,
        }
    }

    #[test]
    fn defaults_come_from_config() {
        let plan = plan(args(), AppConfig::default()).unwrap();
        assert_eq!(plan.input_dir, PathBuf::from("diagrams"));
        assert_eq!(plan.output_dir, PathBuf::from("."));
        assert_eq!(plan.scan.extension, "mermaid");
        assert_eq!(plan.settings.formats, vec![OutputFormat::Svg, OutputFormat::Png]);
        assert_eq!(plan.policy, FailurePolicy::Abort);
        assert_eq!(plan.browser, BrowserLaunchConfig::default());
    }

    #[test]
    fn missing_config_file_fails_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let err = plan(
            RenderArgs {
                config_file: Some(dir.path().join("mermaid.json")),
                ..args()
            },
            AppConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MmbakeError::ConfigFileMissing { .. }));
    }

    #[test]
    fn missing_css_and_browser_files_fail_too() {
        let dir = tempfile::tempdir().unwrap();
        let css = plan(
            RenderArgs {
                css_file: Some(dir.path().join("style.css")),
                ..args()
            },
            AppConfig::default(),
        );
        assert!(matches!(css, Err(MmbakeError::ConfigFileMissing { .. })));

        let browser = plan(
            RenderArgs {
                browser_config_file: Some(dir.path().join("browser.json")),
                ..args()
            },
            AppConfig::default(),
        );
        assert!(matches!(browser, Err(MmbakeError::ConfigFileMissing { .. })));
    }

    #[test]
    fn supplied_files_are_merged_into_settings() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("mermaid.json");
        let css_path = dir.path().join("style.css");
        std::fs::write(&config_path, r#"{"theme":"dark","fontSize":16}"#).unwrap();
        std::fs::write(&css_path, ".node rect { fill: blue; }").unwrap();

        let plan = plan(
            RenderArgs {
                config_file: Some(config_path),
                css_file: Some(css_path),
                keep_going: true,
                ..args()
            },
            AppConfig::default(),
        )
        .unwrap();

        assert_eq!(plan.settings.mermaid_overrides["theme"], json!("dark"));
        assert_eq!(plan.settings.mermaid_overrides["fontSize"], json!(16));
        assert_eq!(plan.settings.theme_css, ".node rect { fill: blue; }");
        assert_eq!(plan.policy, FailurePolicy::Continue);
    }

    #[test]
    fn flags_override_loaded_config() {
        let mut config = AppConfig::default();
        config.render.width = 1600;
        config.scan.input_dir = PathBuf::from("docs/diagrams");

        let plan = plan(
            RenderArgs {
                width: Some(640),
                theme: Some(Theme::Neutral),
                shortcodes: true,
                ..args()
            },
            config,
        )
        .unwrap();

        assert_eq!(plan.settings.width, 640);
        assert_eq!(plan.settings.theme, Theme::Neutral);
        assert_eq!(plan.input_dir, PathBuf::from("docs/diagrams"));
        assert!(plan.scan.shortcodes);
    }

    #[tokio::test]
    async fn empty_input_tree_succeeds_without_a_browser() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(
            RenderArgs {
                input: Some(dir.path().to_path_buf()),
                output: Some(dir.path().join("out")),
                ..args()
            },
            AppConfig::default(),
        )
        .await;
        assert!(result.is_ok(), "{result:?}");
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn missing_input_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = run(
            RenderArgs {
                input: Some(dir.path().join("absent")),
                ..args()
            },
            AppConfig::default(),
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MmbakeError>(),
            Some(MmbakeError::Filesystem { .. })
        ));
    }
}
