// Season merge: join a season's reference rows to its play-by-play rows
// through the identity map, then add ratings and the standard columns the
// metrics expect.

use std::collections::{HashMap, HashSet};

use courtstats_core::metrics::position::position_number;
use courtstats_core::metrics::MetricsError;
use courtstats_core::table::{Table, TableError};
use tracing::{debug, warn};

use crate::discovery::SeasonKey;
use crate::league::LeagueRatings;
use crate::loader::{IndexEntry, LoadError};
use crate::output::OutputError;

/// Anything that aborts one season. Nothing for that season is written.
#[derive(Debug, thiserror::Error)]
pub enum SeasonError {
    #[error("no play-by-play file for {0}")]
    MissingEntityFile(SeasonKey),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("table assembly failed: {0}")]
    Table(#[from] TableError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Identity links for one season label: player_id -> (EntityId, pbp_name).
/// The first entry for a player wins.
pub fn season_links(index: &[IndexEntry], label: &str) -> HashMap<String, (i64, Option<String>)> {
    let mut links = HashMap::new();
    for entry in index.iter().filter(|e| e.year_season == label) {
        links
            .entry(entry.player_id.clone())
            .or_insert((entry.entity_id, entry.pbp_name.clone()));
    }
    links
}

/// Join reference rows to entity rows. Reference rows without a link, or
/// whose entity is absent from the season, are dropped. A player appearing on
/// several reference rows keeps only the first joined row.
pub fn join_season(
    reference: &Table,
    entities: &Table,
    links: &HashMap<String, (i64, Option<String>)>,
) -> Result<Table, TableError> {
    let entity_ids = entities.require_num("EntityId")?;
    let mut entity_rows: HashMap<i64, Vec<usize>> = HashMap::new();
    for (row, id) in entity_ids.iter().enumerate() {
        if let Some(id) = id.filter(|v| v.fract() == 0.0) {
            entity_rows.entry(id as i64).or_default().push(row);
        }
    }

    let mut ref_rows = Vec::new();
    let mut ent_rows = Vec::new();
    let mut joined_ids = Vec::new();
    let mut pbp_names = Vec::new();
    for row in 0..reference.len() {
        let Some((entity_id, pbp_name)) = reference
            .key_at(row, "player_id")
            .and_then(|pid| links.get(&pid))
        else {
            continue;
        };
        for &ent_row in entity_rows.get(entity_id).into_iter().flatten() {
            ref_rows.push(row);
            ent_rows.push(ent_row);
            joined_ids.push(Some(*entity_id as f64));
            pbp_names.push(pbp_name.clone());
        }
    }

    let mut joined = reference.select_rows(&ref_rows);
    joined.set_num("EntityId", joined_ids)?;
    joined.set_text("pbp_name", pbp_names)?;

    let mut right = entities.select_rows(&ent_rows);
    right.remove_column("EntityId");
    joined.append_columns(&right)?;

    Ok(joined.dedup_by("player_id"))
}

/// Per-row ratings from the player's on-court possessions, and relative
/// ratings against the league. Relative ratings are missing when the league
/// rating is unknown.
pub fn add_ratings(table: &mut Table, league: &LeagueRatings) -> Result<(), TableError> {
    let rows = 0..table.len();
    let per100 = |num: Option<f64>, poss: Option<f64>| match (num, poss) {
        (Some(n), Some(p)) if p > 0.0 => Some(n / p * 100.0),
        _ => None,
    };

    let ortg: Vec<Option<f64>> = rows
        .clone()
        .map(|r| {
            let scored = table
                .f64_at(r, "OpponentPoints")
                .zip(table.f64_at(r, "PlusMinus"))
                .map(|(opp, pm)| opp + pm);
            per100(scored, table.f64_at(r, "OffPoss"))
        })
        .collect();
    let drtg: Vec<Option<f64>> = rows
        .map(|r| per100(table.f64_at(r, "OpponentPoints"), table.f64_at(r, "DefPoss")))
        .collect();

    let relative = |values: &[Option<f64>], base: Option<f64>| -> Vec<Option<f64>> {
        values.iter().map(|v| Some((*v)? - base?)).collect()
    };
    let net: Vec<Option<f64>> = ortg
        .iter()
        .zip(&drtg)
        .map(|(o, d)| Some((*o)? - (*d)?))
        .collect();
    let rortg = relative(&ortg, league.ortg);
    let rdrtg = relative(&drtg, league.drtg);

    table.set_num("ortg", ortg)?;
    table.set_num("drtg", drtg)?;
    table.set_num("NetRtg", net)?;
    table.set_num("rortg", rortg)?;
    table.set_num("rdrtg", rdrtg)
}

/// Season identity and position columns: `year`, `is_playoffs`, `nba_id`,
/// `Pos`, `Position_Number`.
pub fn add_standard_columns(table: &mut Table, key: SeasonKey) -> Result<(), TableError> {
    table.set_constant("year", Some(f64::from(key.year)))?;
    let flag = if key.playoffs { "True" } else { "False" };
    table.set_text("is_playoffs", vec![Some(flag.to_string()); table.len()])?;

    let ids = table.require_num("EntityId")?.to_vec();
    table.set_num("nba_id", ids)?;

    let positions: Vec<Option<String>> = (0..table.len()).map(|r| table.key_at(r, "pos")).collect();
    if !table.has_column("pos") {
        debug!("{key}: no pos column; every player gets the default position number");
    }
    let numbers = positions
        .iter()
        .map(|p| Some(position_number(p.as_deref())))
        .collect();
    table.set_text("Pos", positions)?;
    table.set_num("Position_Number", numbers)
}

/// Build one season's merged table, ready for the metrics engine.
pub fn merge_season(
    key: SeasonKey,
    reference: &Table,
    entities: &Table,
    index: &[IndexEntry],
    league: &LeagueRatings,
) -> Result<Table, SeasonError> {
    let links = season_links(index, &key.label());
    if links.is_empty() {
        warn!("{key}: identity map has no entries for this season");
    }
    let mut table = join_season(reference, entities, &links)?;
    let players: HashSet<String> = (0..reference.len())
        .filter_map(|r| reference.key_at(r, "player_id"))
        .collect();
    let dropped = players.len().saturating_sub(table.len());
    if dropped > 0 {
        warn!("{key}: {dropped} players without a resolved identity dropped from the merge");
    }
    add_ratings(&mut table, league)?;
    add_standard_columns(&mut table, key)?;
    Ok(table)
}
