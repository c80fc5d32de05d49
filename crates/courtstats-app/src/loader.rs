// CSV loaders for season tables, salaries, team totals and identity maps.

use courtstats_core::table::{Table, TableError};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("failed to parse table {path}: {source}")]
    Table { path: String, source: TableError },

    #[error("{path} has no `{column}` column")]
    MissingColumn { path: String, column: String },
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Player and possession totals for one team in one season.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamTotals {
    pub points: f64,
    pub off_poss: f64,
    pub opponent_points: f64,
    pub def_poss: f64,
}

/// One row of a previously written identity map.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub year_season: String,
    pub player_id: String,
    pub entity_id: i64,
    pub pbp_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawSalary {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    Year: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    nba_id: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    Salary: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawTeamTotals {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    Points: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    OffPoss: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    OpponentPoints: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    DefPoss: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawIndexEntry {
    year_season: String,
    player_id: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    EntityId: Option<f64>,
    #[serde(default)]
    pbp_name: Option<String>,
}

const TEAM_TOTAL_COLUMNS: [&str; 4] = ["Points", "OffPoss", "OpponentPoints", "DefPoss"];
const SALARY_COLUMNS: [&str; 3] = ["Year", "nba_id", "Salary"];
const INDEX_COLUMNS: [&str; 3] = ["year_season", "player_id", "EntityId"];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whole-number float as an integer id.
fn as_id(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

/// First required column absent from the header row.
fn missing_header<R: Read>(
    reader: &mut csv::Reader<R>,
    required: &[&str],
) -> Result<Option<String>, csv::Error> {
    let headers = reader.headers()?;
    Ok(required
        .iter()
        .find(|c| !headers.iter().any(|h| h == **c))
        .map(|c| c.to_string()))
}

#[derive(Debug)]
enum ReadFailure {
    Csv(csv::Error),
    MissingColumn(String),
}

impl From<csv::Error> for ReadFailure {
    fn from(e: csv::Error) -> Self {
        ReadFailure::Csv(e)
    }
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn with_path(path: &Path, failure: ReadFailure) -> LoadError {
    let path = path.display().to_string();
    match failure {
        ReadFailure::Csv(source) => LoadError::Csv { path, source },
        ReadFailure::MissingColumn(column) => LoadError::MissingColumn { path, column },
    }
}

fn csv_reader<R: Read>(rdr: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr)
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_salaries_from_reader<R: Read>(
    rdr: R,
) -> Result<HashMap<(i32, i64), f64>, ReadFailure> {
    let mut reader = csv_reader(rdr);
    if let Some(column) = missing_header(&mut reader, &SALARY_COLUMNS)? {
        return Err(ReadFailure::MissingColumn(column));
    }
    let mut salaries = HashMap::new();
    for result in reader.deserialize::<RawSalary>() {
        match result {
            Ok(raw) => {
                let (Some(year), Some(id), Some(salary)) = (
                    raw.Year.and_then(as_id),
                    raw.nba_id.and_then(as_id),
                    raw.Salary.filter(|s| s.is_finite()),
                ) else {
                    warn!("skipping salary row with missing Year, nba_id or Salary");
                    continue;
                };
                let key = (year as i32, id);
                if salaries.insert(key, salary).is_some() {
                    warn!("duplicate salary for nba_id {id} in {year}, using latest value");
                }
            }
            Err(e) => {
                warn!("skipping malformed salary row: {}", e);
            }
        }
    }
    Ok(salaries)
}

fn load_team_totals_from_reader<R: Read>(rdr: R) -> Result<Vec<TeamTotals>, ReadFailure> {
    let mut reader = csv_reader(rdr);
    if let Some(column) = missing_header(&mut reader, &TEAM_TOTAL_COLUMNS)? {
        return Err(ReadFailure::MissingColumn(column));
    }
    let mut teams = Vec::new();
    for result in reader.deserialize::<RawTeamTotals>() {
        match result {
            // Missing cells add nothing to the league sums.
            Ok(raw) => teams.push(TeamTotals {
                points: raw.Points.unwrap_or(0.0),
                off_poss: raw.OffPoss.unwrap_or(0.0),
                opponent_points: raw.OpponentPoints.unwrap_or(0.0),
                def_poss: raw.DefPoss.unwrap_or(0.0),
            }),
            Err(e) => {
                warn!("skipping malformed team totals row: {}", e);
            }
        }
    }
    Ok(teams)
}

fn load_index_from_reader<R: Read>(rdr: R) -> Result<Vec<IndexEntry>, ReadFailure> {
    let mut reader = csv_reader(rdr);
    // A run that matched nobody writes an empty map.
    if reader.headers()?.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(column) = missing_header(&mut reader, &INDEX_COLUMNS)? {
        return Err(ReadFailure::MissingColumn(column));
    }
    let mut entries = Vec::new();
    for result in reader.deserialize::<RawIndexEntry>() {
        match result {
            Ok(raw) => {
                let Some(entity_id) = raw.EntityId.and_then(as_id) else {
                    warn!(
                        "skipping identity map row for '{}' in {}: invalid EntityId",
                        raw.player_id, raw.year_season
                    );
                    continue;
                };
                entries.push(IndexEntry {
                    year_season: raw.year_season,
                    player_id: raw.player_id,
                    entity_id,
                    pbp_name: raw.pbp_name.filter(|n| !n.is_empty()),
                });
            }
            Err(e) => {
                warn!("skipping malformed identity map row: {}", e);
            }
        }
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load any CSV file as a [`Table`].
pub fn load_table(path: &Path) -> Result<Table, LoadError> {
    let file = open(path)?;
    Table::from_reader(file).map_err(|e| LoadError::Table {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load the salary table, keyed by (year, nba_id).
pub fn load_salaries(path: &Path) -> Result<HashMap<(i32, i64), f64>, LoadError> {
    let file = open(path)?;
    load_salaries_from_reader(file).map_err(|e| with_path(path, e))
}

/// Load a season's team totals file.
pub fn load_team_totals(path: &Path) -> Result<Vec<TeamTotals>, LoadError> {
    let file = open(path)?;
    load_team_totals_from_reader(file).map_err(|e| with_path(path, e))
}

/// Load an identity map written by the index stage (or curated by hand).
pub fn load_identity_index(path: &Path) -> Result<Vec<IndexEntry>, LoadError> {
    let file = open(path)?;
    load_index_from_reader(file).map_err(|e| with_path(path, e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
