use anyhow::Context;
use clap::Parser;
use tracing::info;

use courtstats_app::cli::Cli;
use courtstats_app::config;
use courtstats_app::logging::init_tracing;
use courtstats_app::pipeline;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = &cli.base_dir;

    let copied = config::ensure_config_files(base_dir).context("failed to prepare config directory")?;
    let config = config::load_config_from(base_dir).context("failed to load configuration")?;

    init_tracing(&config.logging, base_dir)?;
    for path in &copied {
        info!("created {} from defaults", path.display());
    }

    let command = cli.command();
    info!("courtstats {} starting in {}", command.name(), base_dir.display());
    let summary = pipeline::run(&config, command)?;

    let elapsed = summary.finished_at - summary.started_at;
    info!(
        "courtstats {} finished in {:.1}s",
        summary.command,
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    if let Some(index) = &summary.index {
        println!(
            "identity index: {} players matched, {} reference rows unmapped",
            index.matched_players, index.unmapped_rows
        );
    }
    if let Some(merge) = &summary.merge {
        println!(
            "season merge: {} seasons merged, {} skipped, {} master rows",
            merge.seasons_merged,
            merge.seasons_skipped.len(),
            merge.master_rows
        );
    }
    if let Some(rows) = summary.on_off_rows {
        println!("on/off supplement: {rows} rows written");
    }

    Ok(())
}
