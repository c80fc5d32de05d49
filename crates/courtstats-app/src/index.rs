// Identity index stage: resolve every discovered season against one shared
// identity store and collect the identity map, team index and unmapped report.

use std::collections::{BTreeMap, HashSet};

use courtstats_core::identity::{
    EntityPlayer, IdentityMapping, IdentityResolver, IdentityStore, ReferencePlayer,
};
use courtstats_core::table::{Table, TableError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::discovery::{SeasonFiles, SeasonKey};
use crate::loader::{load_table, IndexEntry, LoadError};

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("no play-by-play file for {0}")]
    MissingEntityFile(SeasonKey),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{season}: {source}")]
    Table {
        season: SeasonKey,
        #[source]
        source: TableError,
    },
}

/// One row of the team index: which team id a team code had in a season.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamIndexRow {
    pub team_id: Option<i64>,
    pub team: String,
    pub year_season: String,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    pub mappings: Vec<IdentityMapping>,
    /// Reference rows no pass could resolve, with a `year_season` column.
    pub unmapped: Table,
    pub seasons_resolved: Vec<SeasonKey>,
    pub seasons_skipped: Vec<(SeasonKey, String)>,
}

impl IdentityIndex {
    pub fn unmapped_count(&self) -> usize {
        self.unmapped.len()
    }

    pub fn method_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for m in &self.mappings {
            *counts.entry(m.match_method.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct (team_id, team, year_season) triples in match order.
    pub fn team_index(&self) -> Vec<TeamIndexRow> {
        let mut seen = HashSet::new();
        self.mappings
            .iter()
            .map(|m| TeamIndexRow {
                team_id: m.team_id,
                team: m.team.clone(),
                year_season: m.year_season.clone(),
            })
            .filter(|row| seen.insert(row.clone()))
            .collect()
    }
}

/// Seed an identity store from a previously written map. Later rows for the
/// same player do not override earlier ones.
pub fn seed_store(entries: &[IndexEntry]) -> IdentityStore {
    IdentityStore::seeded(entries.iter().map(|e| (e.player_id.clone(), e.entity_id)))
}

/// Resolve every season in order. A season that cannot be loaded is skipped
/// and reported; the store keeps links from every season that resolved.
pub fn build_index(seasons: &[SeasonFiles], resolver: &mut IdentityResolver) -> IdentityIndex {
    let mut index = IdentityIndex::default();
    let mut unmapped_tables = Vec::new();

    for season in seasons {
        match resolve_season(season, resolver) {
            Ok((mappings, unmapped)) => {
                index.mappings.extend(mappings);
                unmapped_tables.push(unmapped);
                index.seasons_resolved.push(season.key);
            }
            Err(e) => {
                warn!("skipping {}: {e}", season.key);
                index.seasons_skipped.push((season.key, e.to_string()));
            }
        }
    }

    index.unmapped = Table::concat(&unmapped_tables);
    index
}

fn resolve_season(
    season: &SeasonFiles,
    resolver: &mut IdentityResolver,
) -> Result<(Vec<IdentityMapping>, Table), IndexError> {
    let entity_path = season
        .entity
        .as_ref()
        .ok_or(IndexError::MissingEntityFile(season.key))?;
    let reference = load_table(&season.reference)?;
    let entities = load_table(entity_path)?;

    let table_err = |source| IndexError::Table {
        season: season.key,
        source,
    };
    let ref_players = ReferencePlayer::from_table(&reference, resolver.config()).map_err(table_err)?;
    let entity_players = EntityPlayer::from_table(&entities).map_err(table_err)?;

    let label = season.key.label();
    let outcome = resolver.resolve(&ref_players, &entity_players, &label);

    let mut unmapped = reference.select_rows(&outcome.unmapped_rows);
    unmapped
        .set_text("year_season", vec![Some(label); unmapped.len()])
        .map_err(table_err)?;
    Ok((outcome.matches, unmapped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtstats_core::identity::{MatchMethod, MatcherConfig};
    use std::fs;
    use tempfile::TempDir;

    use crate::discovery::discover_seasons;

    fn write(dir: &std::path::Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn builds_index_across_seasons() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        write(
            dir,
            "2010_bballref.csv",
            "player_id,player,team,g,mp,pts\np1,Ann Alpha,ATL,10,200,80\np2,Zed Nobody,ATL,1,2,0\n",
        );
        write(
            dir,
            "2010_pbp.csv",
            "EntityId,Name,TeamAbbreviation,TeamId,GamesPlayed,Minutes,Points\n7,Ann Alpha,ATL,11,10,200,80\n",
        );
        write(
            dir,
            "2010ps_bballref.csv",
            "player_id,player,team,g,mp,pts\np1,A. Alpha,ATL,2,40,10\n",
        );
        write(
            dir,
            "2010ps_pbp.csv",
            "EntityId,Name,TeamAbbreviation,TeamId,GamesPlayed,Minutes,Points\n7,Ann Alpha,ATL,11,2,40,10\n",
        );
        write(dir, "2011_bballref.csv", "player_id,player,team\np1,Ann Alpha,ATL\n");

        let seasons = discover_seasons(dir).unwrap();
        let mut resolver = IdentityResolver::new(IdentityStore::new(), MatcherConfig::default());
        let index = build_index(&seasons, &mut resolver);

        assert_eq!(index.seasons_resolved.len(), 2);
        assert_eq!(index.seasons_skipped.len(), 1);
        assert_eq!(index.seasons_skipped[0].0, SeasonKey::new(2011, false));

        assert_eq!(index.mappings.len(), 2);
        assert_eq!(index.mappings[0].match_method, MatchMethod::ExactTeamName);
        assert_eq!(index.mappings[1].match_method, MatchMethod::PersistentId);
        assert_eq!(index.mappings[1].year_season, "2010ps");

        assert_eq!(index.unmapped_count(), 1);
        assert_eq!(index.unmapped.key_at(0, "player_id").as_deref(), Some("p2"));
        assert_eq!(index.unmapped.key_at(0, "year_season").as_deref(), Some("2010"));

        let teams = index.team_index();
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0].team_id, Some(11));
        assert_eq!(index.method_counts().get("persistent_id"), Some(&1));
    }

    #[test]
    fn seeded_store_keeps_first_link() {
        let entries = vec![
            IndexEntry {
                year_season: "2010".into(),
                player_id: "p1".into(),
                entity_id: 7,
                pbp_name: None,
            },
            IndexEntry {
                year_season: "2011".into(),
                player_id: "p1".into(),
                entity_id: 8,
                pbp_name: None,
            },
        ];
        let store = seed_store(&entries);
        assert_eq!(store.get("p1"), Some(7));
    }
}
