//! List discovered definitions without rendering them.

use std::path::PathBuf;

use mmbake_common::config::AppConfig;
use mmbake_render_engine::output_paths;
use mmbake_scanner::{DefinitionScanner, ScanOptions};

pub fn run(
    input: Option<PathBuf>,
    extension: Option<String>,
    shortcodes: bool,
    config: AppConfig,
) -> anyhow::Result<()> {
    let input_dir = input.unwrap_or(config.scan.input_dir);
    let options = ScanOptions {
        extension: extension.unwrap_or(config.scan.extension),
        shortcodes,
    };

    println!("Definitions under: {}", input_dir.display());

    let mut count = 0usize;
    for definition in DefinitionScanner::new(&input_dir, options)? {
        let definition = definition?;
        let outputs = output_paths(
            &config.scan.output_dir,
            &definition,
            &config.render.formats,
        );
        let names = outputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} -> {}", definition.source_file().display(), names);
        count += 1;
    }

    if count == 0 {
        println!("  (none)");
    } else {
        println!("\n{count} definition(s) found.");
    }

    Ok(())
}
