// Pipeline driver: the identity index stage, the season merge stage and the
// on/off supplement, plus the run summary.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use courtstats_core::identity::{IdentityResolver, IdentityStore};
use courtstats_core::metrics::{MetricContext, MetricsEngine};
use courtstats_core::table::Table;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::Command;
use crate::config::Config;
use crate::discovery::{discover_seasons, SeasonFiles};
use crate::index::{build_index, seed_store};
use crate::league::{league_true_shooting, LeagueRatings, ShootingBaseline};
use crate::loader::{
    load_identity_index, load_salaries, load_table, load_team_totals, IndexEntry,
};
use crate::merge::{merge_season, SeasonError};
use crate::output::{write_json, write_records, write_table};
use crate::supplements::{attach_on_off, pivot_on_off};

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSeason {
    pub season: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexSummary {
    pub seasons_resolved: usize,
    pub seasons_skipped: Vec<SkippedSeason>,
    pub matched_players: usize,
    pub unmapped_rows: usize,
    pub match_methods: BTreeMap<String, usize>,
    pub seeded_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeSummary {
    pub seasons_merged: usize,
    pub seasons_skipped: Vec<SkippedSeason>,
    pub master_rows: usize,
    /// Metric group -> number of seasons it was skipped for.
    pub metric_groups_skipped: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_off_rows: Option<usize>,
}

fn seasons_in(dir: &Path) -> Result<Vec<SeasonFiles>> {
    let seasons = discover_seasons(dir)
        .with_context(|| format!("failed to list season files in {}", dir.display()))?;
    if seasons.is_empty() {
        warn!("no *_bballref.csv files found in {}", dir.display());
    }
    Ok(seasons)
}

// ---------------------------------------------------------------------------
// Identity index stage
// ---------------------------------------------------------------------------

/// Resolve every season and write the identity map, team index and unmapped
/// report.
pub fn run_index(config: &Config) -> Result<IndexSummary> {
    let seasons = seasons_in(&config.data_dir())?;

    let (store, seeded_links) = match config.input_file(config.paths.seed_identity_map.as_deref()) {
        Some(path) => {
            let entries = load_identity_index(&path).context("failed to load seed identity map")?;
            let store = seed_store(&entries);
            info!("seeded {} identity links from {}", store.len(), path.display());
            let seeded = store.len();
            (store, seeded)
        }
        None => (IdentityStore::new(), 0),
    };

    let mut resolver = IdentityResolver::new(store, config.matching.clone());
    let index = build_index(&seasons, &mut resolver);

    write_records(&config.output_file(&config.paths.identity_map), &index.mappings)?;
    write_records(&config.output_file(&config.paths.team_index), &index.team_index())?;
    write_table(&config.output_file(&config.paths.unmapped), &index.unmapped)?;

    let summary = IndexSummary {
        seasons_resolved: index.seasons_resolved.len(),
        seasons_skipped: index
            .seasons_skipped
            .iter()
            .map(|(key, reason)| SkippedSeason {
                season: key.label(),
                reason: reason.clone(),
            })
            .collect(),
        matched_players: index.mappings.len(),
        unmapped_rows: index.unmapped_count(),
        match_methods: index.method_counts(),
        seeded_links,
    };
    info!(
        "identity index: {} seasons resolved, {} skipped, {} players matched, {} rows unmapped",
        summary.seasons_resolved,
        summary.seasons_skipped.len(),
        summary.matched_players,
        summary.unmapped_rows
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Season merge stage
// ---------------------------------------------------------------------------

/// Merge and enrich one season, writing its combined file. A regular season
/// registers its league TS baseline in `ctx` before enrichment, so the same
/// year's playoffs are centred on it too.
fn merge_one(
    config: &Config,
    season: &SeasonFiles,
    index: &[IndexEntry],
    engine: &MetricsEngine,
    ctx: &mut MetricContext,
    summary: &mut MergeSummary,
) -> Result<(Table, Option<ShootingBaseline>), SeasonError> {
    let key = season.key;
    let entity_path = season
        .entity
        .as_ref()
        .ok_or(SeasonError::MissingEntityFile(key))?;
    info!("processing {key}");

    let reference = load_table(&season.reference)?;
    let entities = load_table(entity_path)?;

    let league = match &season.team_totals {
        Some(path) => LeagueRatings::from_team_totals(&load_team_totals(path)?),
        None => {
            debug!("{key}: no team totals; relative ratings will be missing");
            LeagueRatings::default()
        }
    };
    if let (Some(ortg), Some(drtg)) = (league.ortg, league.drtg) {
        info!("{key}: league ortg {ortg:.2}, drtg {drtg:.2}");
    }

    let baseline = if key.playoffs {
        None
    } else {
        league_true_shooting(&entities).map(|ts| {
            ctx.league_ts.insert(key.year, ts);
            ShootingBaseline::new(key, ts)
        })
    };

    let mut table = merge_season(key, &reference, &entities, index, &league)?;
    let report = engine.apply(&mut table, ctx)?;
    for skipped in report.skipped {
        *summary.metric_groups_skipped.entry(skipped.group).or_insert(0) += 1;
    }

    let path = config.output_file(&key.combined_file());
    write_table(&path, &table)?;
    info!("{key}: {} rows saved to {}", table.len(), path.display());
    Ok((table, baseline))
}

/// Merge every season using the identity map written by the index stage.
/// Returns the summary and the multi-season master table.
pub fn run_merge(config: &Config) -> Result<(MergeSummary, Table)> {
    let seasons = seasons_in(&config.data_dir())?;

    let map_path = config.output_file(&config.paths.identity_map);
    let index = load_identity_index(&map_path)
        .context("failed to load identity map; run the index stage first")?;

    let mut ctx = MetricContext {
        defensive_baseline: config.metrics.defensive_baseline(),
        ..MetricContext::default()
    };
    if let Some(path) = config.input_file(config.paths.salary.as_deref()) {
        ctx.salaries = load_salaries(&path).context("failed to load salary table")?;
        info!("loaded {} salaries from {}", ctx.salaries.len(), path.display());
    }
    let engine = MetricsEngine::standard().context("failed to schedule metric groups")?;

    let mut summary = MergeSummary::default();
    let mut tables = Vec::new();
    let mut baselines = Vec::new();
    for season in &seasons {
        match merge_one(config, season, &index, &engine, &mut ctx, &mut summary) {
            Ok((table, baseline)) => {
                tables.push(table);
                baselines.extend(baseline);
                summary.seasons_merged += 1;
            }
            Err(e) => {
                warn!("skipping {}: {e}", season.key);
                summary.seasons_skipped.push(SkippedSeason {
                    season: season.key.label(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let master = Table::concat(&tables);
    summary.master_rows = master.len();
    write_table(&config.output_file(&config.paths.master), &master)?;
    if baselines.is_empty() {
        warn!("no regular season produced a shooting baseline");
    }
    write_records(&config.output_file(&config.paths.shooting_baseline), &baselines)?;

    info!(
        "season merge: {} seasons merged, {} skipped, {} master rows",
        summary.seasons_merged,
        summary.seasons_skipped.len(),
        summary.master_rows
    );
    Ok((summary, master))
}

// ---------------------------------------------------------------------------
// On/off supplement
// ---------------------------------------------------------------------------

/// Attach the on/off shooting breakdown to the master table when configured.
/// Returns the number of rows written, or `None` when no on/off file is set.
pub fn run_on_off(config: &Config, master: &Table) -> Result<Option<usize>> {
    let Some(path) = config.input_file(config.paths.on_off.as_deref()) else {
        return Ok(None);
    };
    let on_off = load_table(&path).context("failed to load on/off table")?;
    let pivot = pivot_on_off(&on_off).context("failed to pivot on/off table")?;
    let updated = attach_on_off(master, &pivot).context("failed to attach on/off columns")?;
    write_table(&config.output_file(&config.paths.on_off_output), &updated)?;
    Ok(Some(updated.len()))
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Run a command and write the run summary.
pub fn run(config: &Config, command: Command) -> Result<RunSummary> {
    let started_at = Utc::now();
    let mut summary = RunSummary {
        command: command.name().to_string(),
        started_at,
        finished_at: started_at,
        index: None,
        merge: None,
        on_off_rows: None,
    };

    match command {
        Command::Index => {
            summary.index = Some(run_index(config)?);
        }
        Command::Merge => {
            let (merge, _) = run_merge(config)?;
            summary.merge = Some(merge);
        }
        Command::Run => {
            summary.index = Some(run_index(config)?);
            let (merge, master) = run_merge(config)?;
            summary.merge = Some(merge);
            summary.on_off_rows = run_on_off(config, &master)?;
        }
    }

    summary.finished_at = Utc::now();
    write_json(&config.output_file(&config.paths.run_summary), &summary)?;
    Ok(summary)
}
