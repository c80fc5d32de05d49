// Player identity resolution between the reference source (string player_id)
// and the play-by-play source (integer EntityId).
//
// A season is resolved by running an ordered list of match passes. Each pass
// only sees reference players still unresolved and entities not yet taken, so
// no entity is ever assigned twice within a season.

pub mod passes;
pub mod store;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::normalize::normalize;
use crate::table::{Table, TableError};

use passes::{
    run_pass, ExactNameGlobalPass, ExactTeamNamePass, FuzzyNamePass, MatchPass, PersistentIdPass,
    StatsPass,
};
pub use store::IdentityStore;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for the match passes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Sequence ratio must be strictly above this for a fuzzy match.
    pub fuzzy_threshold: f64,
    /// Reference names must be strictly longer than this for a substring match.
    pub substring_min_len: usize,
    pub minutes_tolerance: f64,
    pub points_tolerance: f64,
    /// Reference team code -> play-by-play team code.
    pub team_aliases: HashMap<String, String>,
    /// Team code the reference source uses for a multi-team season total.
    pub multi_team_marker: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            substring_min_len: 5,
            minutes_tolerance: 5.0,
            points_tolerance: 2.0,
            team_aliases: HashMap::from([("SAS".to_string(), "SAN".to_string())]),
            multi_team_marker: "TOT".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// One row of a reference season table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePlayer {
    /// Row index in the source table.
    pub row: usize,
    pub player_id: Option<String>,
    pub name: String,
    pub team: String,
    pub games: Option<f64>,
    pub minutes: Option<f64>,
    pub points: Option<f64>,
    pub(crate) norm_name: String,
    /// Team code after alias mapping.
    pub(crate) team_mapped: String,
}

impl ReferencePlayer {
    pub fn new(
        row: usize,
        player_id: Option<String>,
        name: &str,
        team: &str,
        config: &MatcherConfig,
    ) -> Self {
        let team_mapped = config
            .team_aliases
            .get(team)
            .cloned()
            .unwrap_or_else(|| team.to_string());
        Self {
            row,
            player_id,
            name: name.to_string(),
            team: team.to_string(),
            games: None,
            minutes: None,
            points: None,
            norm_name: normalize(name),
            team_mapped,
        }
    }

    pub fn with_stats(mut self, games: Option<f64>, minutes: Option<f64>, points: Option<f64>) -> Self {
        self.games = games;
        self.minutes = minutes;
        self.points = points;
        self
    }

    /// Read players from a reference table (`player_id`, `player`, `team`
    /// required; `g`, `mp`, `pts` optional).
    pub fn from_table(table: &Table, config: &MatcherConfig) -> Result<Vec<Self>, TableError> {
        for required in ["player_id", "player", "team"] {
            if !table.has_column(required) {
                return Err(TableError::MissingColumn(required.to_string()));
            }
        }
        Ok((0..table.len())
            .map(|row| {
                let name = table.key_at(row, "player").unwrap_or_default();
                let team = table.key_at(row, "team").unwrap_or_default();
                Self::new(row, table.key_at(row, "player_id"), &name, &team, config).with_stats(
                    table.f64_at(row, "g"),
                    table.f64_at(row, "mp"),
                    table.f64_at(row, "pts"),
                )
            })
            .collect())
    }

    pub(crate) fn is_multi_team(&self, config: &MatcherConfig) -> bool {
        self.team == config.multi_team_marker
    }
}

/// One row of a play-by-play season table.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPlayer {
    pub entity_id: i64,
    pub name: String,
    pub team_abbreviation: String,
    pub team_id: Option<i64>,
    pub games_played: Option<f64>,
    pub minutes: Option<f64>,
    pub points: Option<f64>,
    pub(crate) norm_name: String,
}

impl EntityPlayer {
    pub fn new(entity_id: i64, name: &str, team_abbreviation: &str) -> Self {
        Self {
            entity_id,
            name: name.to_string(),
            team_abbreviation: team_abbreviation.to_string(),
            team_id: None,
            games_played: None,
            minutes: None,
            points: None,
            norm_name: normalize(name),
        }
    }

    pub fn with_stats(mut self, games: Option<f64>, minutes: Option<f64>, points: Option<f64>) -> Self {
        self.games_played = games;
        self.minutes = minutes;
        self.points = points;
        self
    }

    pub fn with_team_id(mut self, team_id: Option<i64>) -> Self {
        self.team_id = team_id;
        self
    }

    /// Read entities from a play-by-play table (`EntityId`, `Name`,
    /// `TeamAbbreviation` required). Rows without an EntityId are skipped.
    pub fn from_table(table: &Table) -> Result<Vec<Self>, TableError> {
        table.require_num("EntityId")?;
        for required in ["Name", "TeamAbbreviation"] {
            if !table.has_column(required) {
                return Err(TableError::MissingColumn(required.to_string()));
            }
        }
        Ok((0..table.len())
            .filter_map(|row| {
                let Some(entity_id) = table.f64_at(row, "EntityId").filter(|id| id.fract() == 0.0)
                else {
                    warn!("skipping play-by-play row {row}: missing or non-integer EntityId");
                    return None;
                };
                let entity_id = entity_id as i64;
                let name = table.key_at(row, "Name").unwrap_or_default();
                let team = table.key_at(row, "TeamAbbreviation").unwrap_or_default();
                Some(
                    Self::new(entity_id, &name, &team)
                        .with_team_id(table.f64_at(row, "TeamId").map(|t| t as i64))
                        .with_stats(
                            table.f64_at(row, "GamesPlayed"),
                            table.f64_at(row, "Minutes"),
                            table.f64_at(row, "Points"),
                        ),
                )
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Which pass produced a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    PersistentId,
    ExactTeamName,
    ExactNameGlobal,
    Substring,
    Fuzzy,
    StatsMatchLenient,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::PersistentId => "persistent_id",
            MatchMethod::ExactTeamName => "exact_team_name",
            MatchMethod::ExactNameGlobal => "exact_name_global",
            MatchMethod::Substring => "substring",
            MatchMethod::Fuzzy => "fuzzy",
            MatchMethod::StatsMatchLenient => "stats_match_lenient",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved link, as written to the identity map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityMapping {
    pub year_season: String,
    pub player_id: String,
    #[serde(rename = "EntityId")]
    pub entity_id: i64,
    pub ref_name: String,
    pub pbp_name: String,
    pub team: String,
    pub team_id: Option<i64>,
    pub match_method: MatchMethod,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    pub matches: Vec<IdentityMapping>,
    /// Reference rows that ended up linked (directly or via a sibling row of
    /// the same player).
    pub matched_rows: Vec<usize>,
    /// Reference rows whose player never matched.
    pub unmapped_rows: Vec<usize>,
}

impl ResolveOutcome {
    pub fn method_counts(&self) -> BTreeMap<MatchMethod, usize> {
        let mut counts = BTreeMap::new();
        for m in &self.matches {
            *counts.entry(m.match_method).or_insert(0) += 1;
        }
        counts
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Runs the match passes season by season, carrying an [`IdentityStore`]
/// across seasons.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    config: MatcherConfig,
    store: IdentityStore,
}

impl IdentityResolver {
    pub fn new(store: IdentityStore, config: MatcherConfig) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &IdentityStore {
        &self.store
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn into_store(self) -> IdentityStore {
        self.store
    }

    /// Resolve one season. Every new link is recorded in the store.
    pub fn resolve(
        &mut self,
        reference: &[ReferencePlayer],
        entities: &[EntityPlayer],
        season_label: &str,
    ) -> ResolveOutcome {
        let mut consumed: HashSet<i64> = HashSet::new();
        let mut outcome = ResolveOutcome::default();

        // Rows without a player_id have nothing to link.
        let mut unresolved: Vec<&ReferencePlayer> =
            reference.iter().filter(|p| p.player_id.is_some()).collect();

        let persistent = PersistentIdPass { store: &self.store };
        let team_name = ExactTeamNamePass { config: &self.config };
        let global_name = ExactNameGlobalPass;
        let fuzzy = FuzzyNamePass { config: &self.config };
        let stats = StatsPass { config: &self.config };
        let pipeline: [&dyn MatchPass; 5] = [&persistent, &team_name, &global_name, &fuzzy, &stats];

        let mut links: Vec<(String, i64)> = Vec::new();
        for pass in pipeline {
            let result = run_pass(pass, unresolved, entities, &consumed);
            debug!(
                "{season_label}: pass {} matched {} players, {} remain",
                pass.name(),
                result.matched.len(),
                result.unresolved.len()
            );
            for (player, entity, method) in result.matched {
                consumed.insert(entity.entity_id);
                let player_id = player.player_id.clone().unwrap_or_default();
                links.push((player_id.clone(), entity.entity_id));
                outcome.matches.push(IdentityMapping {
                    year_season: season_label.to_string(),
                    player_id,
                    entity_id: entity.entity_id,
                    ref_name: player.name.clone(),
                    pbp_name: entity.name.clone(),
                    team: player.team.clone(),
                    team_id: entity.team_id,
                    match_method: method,
                });
            }
            unresolved = result.unresolved;
        }
        for (player_id, entity_id) in links {
            self.store.record(&player_id, entity_id);
        }

        let matched_ids: HashSet<&str> = outcome
            .matches
            .iter()
            .map(|m| m.player_id.as_str())
            .collect();
        for player in reference {
            let matched = player
                .player_id
                .as_deref()
                .is_some_and(|id| matched_ids.contains(id));
            if matched {
                outcome.matched_rows.push(player.row);
            } else {
                outcome.unmapped_rows.push(player.row);
            }
        }

        info!(
            "{season_label}: {} players linked, {} reference rows unmapped",
            outcome.matches.len(),
            outcome.unmapped_rows.len()
        );
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
