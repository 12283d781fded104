//! mmbake CLI: render mermaid definitions found under a directory tree.
//!
//! Usage:
//!   mmbake render [OPTIONS]    Render every definition to SVG and PNG
//!   mmbake list [OPTIONS]      Show what a render would produce

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mmbake_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "mmbake",
    about = "Render mermaid diagram definitions through a headless browser",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every definition under the input directory
    Render(commands::render::RenderArgs),

    /// List discovered definitions and their output files without rendering
    List {
        /// Directory searched for definitions
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Definition file suffix, without the dot
        #[arg(long)]
        extension: Option<String>,

        /// Also extract mermaid shortcodes from Markdown files
        #[arg(long)]
        shortcodes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.log_json {
        config.logging.json = true;
    }
    mmbake_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Render(args) => commands::render::run(args, config).await,
        Commands::List {
            input,
            extension,
            shortcodes,
        } => commands::list::run(input, extension, shortcodes, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mmbake_common::config::{Background, OutputFormat, Theme};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn render_flags_parse_into_typed_values() {
        let cli = Cli::try_parse_from([
            "mmbake", "render", "-t", "forest", "-w", "1024", "-H", "768", "-b", "transparent",
            "--format", "svg,pdf", "--keep-going",
        ])
        .unwrap();

        let Commands::Render(args) = cli.command else {
            panic!("expected render command");
        };
        assert_eq!(args.theme, Some(Theme::Forest));
        assert_eq!(args.width, Some(1024));
        assert_eq!(args.height, Some(768));
        assert_eq!(args.background, Some(Background::Transparent));
        assert_eq!(args.format, vec![OutputFormat::Svg, OutputFormat::Pdf]);
        assert!(args.keep_going);
    }

    #[test]
    fn unknown_theme_is_rejected() {
        assert!(Cli::try_parse_from(["mmbake", "render", "-t", "solarized"]).is_err());
    }

    #[test]
    fn zero_width_is_rejected() {
        assert!(Cli::try_parse_from(["mmbake", "render", "-w", "0"]).is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["mmbake", "list", "--verbose"]).unwrap();
        assert!(cli.verbose);
    }
}
