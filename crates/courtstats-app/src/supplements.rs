// On/off shooting supplement: pivot the lineup on/off breakdown by status
// and attach it to the master table.

use std::collections::{BTreeSet, HashMap};

use courtstats_core::table::{Table, TableError};
use tracing::{info, warn};

const ZONES: [&str; 5] = ["AtRim", "ShortMidRange", "LongMidRange", "Corner3", "Arc3"];

/// Shooting stats carried over from the on/off table, in output order.
pub fn on_off_stats() -> Vec<String> {
    ZONES
        .iter()
        .flat_map(|zone| [format!("{zone}Frequency"), format!("{zone}Accuracy")])
        .collect()
}

type PivotKey = (String, String, String);

/// One row per (player_id, team_id, year_season) with a `{stat}_{status}`
/// column per stat and status, holding the mean over duplicate rows.
/// Output key columns are `player_id`, `TeamId` and `year_season`.
pub fn pivot_on_off(on_off: &Table) -> Result<Table, TableError> {
    for required in ["player_id", "team_id", "year_season", "status"] {
        if !on_off.has_column(required) {
            return Err(TableError::MissingColumn(required.to_string()));
        }
    }
    let stats: Vec<String> = on_off_stats()
        .into_iter()
        .filter(|s| on_off.has_column(s))
        .collect();
    if stats.is_empty() {
        warn!("on/off table has none of the zone frequency/accuracy columns");
    }

    let mut order: Vec<PivotKey> = Vec::new();
    let mut rows_by_key: HashMap<PivotKey, Vec<(String, usize)>> = HashMap::new();
    let mut statuses: BTreeSet<String> = BTreeSet::new();
    for row in 0..on_off.len() {
        let (Some(pid), Some(team), Some(season), Some(status)) = (
            on_off.key_at(row, "player_id"),
            on_off.key_at(row, "team_id"),
            on_off.key_at(row, "year_season"),
            on_off.key_at(row, "status"),
        ) else {
            continue;
        };
        let key = (pid, team, season);
        let group = rows_by_key.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Vec::new()
        });
        group.push((status.clone(), row));
        statuses.insert(status);
    }

    let mut pivot = Table::with_rows(order.len());
    pivot.set_text("player_id", order.iter().map(|k| Some(k.0.clone())).collect())?;
    pivot.set_text("TeamId", order.iter().map(|k| Some(k.1.clone())).collect())?;
    pivot.set_text("year_season", order.iter().map(|k| Some(k.2.clone())).collect())?;

    for stat in &stats {
        for status in &statuses {
            let values = order
                .iter()
                .map(|key| {
                    let cells: Vec<f64> = rows_by_key[key]
                        .iter()
                        .filter(|(s, _)| s == status)
                        .filter_map(|(_, row)| on_off.f64_at(*row, stat))
                        .collect();
                    (!cells.is_empty()).then(|| cells.iter().sum::<f64>() / cells.len() as f64)
                })
                .collect();
            pivot.set_num(&format!("{stat}_{status}"), values)?;
        }
    }
    Ok(pivot)
}

/// `year_season` label of a master row: the year, plus `ps` for playoffs.
fn master_season_label(master: &Table, row: usize) -> Option<String> {
    let year = master.f64_at(row, "year")?;
    let playoffs = master
        .key_at(row, "is_playoffs")
        .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1"));
    Some(format!("{}{}", year as i64, if playoffs { "ps" } else { "" }))
}

/// Left-join the pivoted on/off columns onto the master table on
/// (player_id, TeamId, season label). Unmatched rows get missing values.
pub fn attach_on_off(master: &Table, pivot: &Table) -> Result<Table, TableError> {
    let mut lookup: HashMap<PivotKey, usize> = HashMap::new();
    for row in 0..pivot.len() {
        if let (Some(pid), Some(team), Some(season)) = (
            pivot.key_at(row, "player_id"),
            pivot.key_at(row, "TeamId"),
            pivot.key_at(row, "year_season"),
        ) {
            lookup.entry((pid, team, season)).or_insert(row);
        }
    }

    let matches: Vec<Option<usize>> = (0..master.len())
        .map(|row| {
            let key = (
                master.key_at(row, "player_id")?,
                master.key_at(row, "TeamId")?,
                master_season_label(master, row)?,
            );
            lookup.get(&key).copied()
        })
        .collect();

    let mut extra = Table::with_rows(master.len());
    for name in pivot.column_names() {
        if name == "player_id" || name == "TeamId" {
            continue;
        }
        if name == "year_season" {
            let values = matches
                .iter()
                .map(|m| m.and_then(|r| pivot.key_at(r, name)))
                .collect();
            extra.set_text(name, values)?;
        } else {
            let values = matches
                .iter()
                .map(|m| m.and_then(|r| pivot.f64_at(r, name)))
                .collect();
            extra.set_num(name, values)?;
        }
    }

    let matched = matches.iter().filter(|m| m.is_some()).count();
    info!("on/off shooting attached to {matched} of {} master rows", master.len());

    let mut out = master.clone();
    out.append_columns(&extra)?;
    Ok(out)
}
