use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use langprobe::logging::{self, Verbosity};
use langprobe::{cli, DetectionOrchestrator};
use tracing::{info, warn};

fn main() -> Result<()> {
    let args = cli::Args::parse();
    logging::init(Verbosity::from_flags(args.verbose, args.quiet));
    args.validate().context("Invalid arguments")?;

    let config = args.resolve_config()?;
    let orchestrator = DetectionOrchestrator::new(&args.path, &config);

    let report = orchestrator.discover_plugins(&config.plugin_dir_for(orchestrator.root()));
    if !report.failed.is_empty() {
        warn!(failed = report.failed.len(), "some plugin files could not be loaded");
    }

    let outcome = orchestrator.detect_languages(config.parallel);
    info!(
        root = %orchestrator.root().display(),
        languages = outcome.languages.len(),
        "detection finished"
    );

    let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize result")?;
    println!("{json}");
    Ok(())
}
