// Ordered match passes. Each pass picks at most one entity for a reference
// player from the entities still available; ambiguity defers the player to
// the next pass.

use std::collections::HashSet;

use difflib::sequencematcher::SequenceMatcher;

use super::store::IdentityStore;
use super::{EntityPlayer, MatchMethod, MatcherConfig, ReferencePlayer};

pub trait MatchPass {
    fn name(&self) -> &'static str;

    /// Choose an entity for `player` among `available`, tagging the method.
    fn select<'e>(
        &self,
        player: &ReferencePlayer,
        available: &[&'e EntityPlayer],
    ) -> Option<(&'e EntityPlayer, MatchMethod)>;
}

pub struct PassResult<'r, 'e> {
    pub matched: Vec<(&'r ReferencePlayer, &'e EntityPlayer, MatchMethod)>,
    pub unresolved: Vec<&'r ReferencePlayer>,
}

/// Apply one pass to the unresolved players. Entities in `consumed`, and
/// entities taken earlier in this pass, are never offered again. Once a
/// player_id matches, its other rows (multi-team stints) are resolved too.
pub fn run_pass<'r, 'e>(
    pass: &dyn MatchPass,
    unresolved: Vec<&'r ReferencePlayer>,
    entities: &'e [EntityPlayer],
    consumed: &HashSet<i64>,
) -> PassResult<'r, 'e> {
    let mut taken: HashSet<i64> = consumed.clone();
    let mut matched_ids: HashSet<&str> = HashSet::new();
    let mut matched = Vec::new();

    for &player in &unresolved {
        let Some(player_id) = player.player_id.as_deref() else {
            continue;
        };
        if matched_ids.contains(player_id) {
            continue;
        }
        let available: Vec<&EntityPlayer> = entities
            .iter()
            .filter(|e| !taken.contains(&e.entity_id))
            .collect();
        if let Some((entity, method)) = pass.select(player, &available) {
            taken.insert(entity.entity_id);
            matched_ids.insert(player_id);
            matched.push((player, entity, method));
        }
    }

    let still_unresolved = unresolved
        .into_iter()
        .filter(|p| {
            p.player_id
                .as_deref()
                .is_some_and(|id| !matched_ids.contains(id))
        })
        .collect();

    PassResult {
        matched,
        unresolved: still_unresolved,
    }
}

fn exactly_one<'e>(mut candidates: impl Iterator<Item = &'e EntityPlayer>) -> Option<&'e EntityPlayer> {
    let first = candidates.next()?;
    match candidates.next() {
        Some(_) => None,
        None => Some(first),
    }
}

/// Candidates on the player's (aliased) team, or every entity for a
/// multi-team row.
fn team_scope<'a, 'e>(
    player: &'a ReferencePlayer,
    available: &'a [&'e EntityPlayer],
    config: &'a MatcherConfig,
) -> impl Iterator<Item = &'e EntityPlayer> + 'a {
    let any_team = player.is_multi_team(config);
    available
        .iter()
        .copied()
        .filter(move |e| any_team || e.team_abbreviation == player.team_mapped)
}

// ---------------------------------------------------------------------------
// Pass 1: remembered links
// ---------------------------------------------------------------------------

pub struct PersistentIdPass<'s> {
    pub store: &'s IdentityStore,
}

impl MatchPass for PersistentIdPass<'_> {
    fn name(&self) -> &'static str {
        "persistent_id"
    }

    fn select<'e>(
        &self,
        player: &ReferencePlayer,
        available: &[&'e EntityPlayer],
    ) -> Option<(&'e EntityPlayer, MatchMethod)> {
        let entity_id = self.store.get(player.player_id.as_deref()?)?;
        available
            .iter()
            .copied()
            .find(|e| e.entity_id == entity_id)
            .map(|e| (e, MatchMethod::PersistentId))
    }
}

// ---------------------------------------------------------------------------
// Pass 2: exact name on the same team
// ---------------------------------------------------------------------------

pub struct ExactTeamNamePass<'c> {
    pub config: &'c MatcherConfig,
}

impl MatchPass for ExactTeamNamePass<'_> {
    fn name(&self) -> &'static str {
        "exact_team_name"
    }

    fn select<'e>(
        &self,
        player: &ReferencePlayer,
        available: &[&'e EntityPlayer],
    ) -> Option<(&'e EntityPlayer, MatchMethod)> {
        if player.norm_name.is_empty() {
            return None;
        }
        // No entity carries team "TOT", so multi-team rows fall to pass 3.
        exactly_one(available.iter().copied().filter(|e| {
            e.norm_name == player.norm_name && e.team_abbreviation == player.team_mapped
        }))
        .map(|e| (e, MatchMethod::ExactTeamName))
    }
}

// ---------------------------------------------------------------------------
// Pass 3: exact name on any team
// ---------------------------------------------------------------------------

pub struct ExactNameGlobalPass;

impl MatchPass for ExactNameGlobalPass {
    fn name(&self) -> &'static str {
        "exact_name_global"
    }

    fn select<'e>(
        &self,
        player: &ReferencePlayer,
        available: &[&'e EntityPlayer],
    ) -> Option<(&'e EntityPlayer, MatchMethod)> {
        if player.norm_name.is_empty() {
            return None;
        }
        exactly_one(
            available
                .iter()
                .copied()
                .filter(|e| e.norm_name == player.norm_name),
        )
        .map(|e| (e, MatchMethod::ExactNameGlobal))
    }
}

// ---------------------------------------------------------------------------
// Pass 4: substring or fuzzy name within team scope
// ---------------------------------------------------------------------------

pub struct FuzzyNamePass<'c> {
    pub config: &'c MatcherConfig,
}

impl FuzzyNamePass<'_> {
    fn judge(&self, player: &ReferencePlayer, entity: &EntityPlayer) -> Option<MatchMethod> {
        let a = player.norm_name.as_str();
        let b = entity.norm_name.as_str();
        // An empty name is a substring of every name.
        if a.is_empty() || b.is_empty() {
            return None;
        }
        let contains = a.contains(b) || b.contains(a);
        if contains && a.len() > self.config.substring_min_len {
            Some(MatchMethod::Substring)
        } else if name_similarity(a, b) > self.config.fuzzy_threshold {
            Some(MatchMethod::Fuzzy)
        } else {
            None
        }
    }
}

/// Ratcliff/Obershelp similarity in [0, 1]. Normalized names are ASCII, so
/// comparing bytes is comparing characters.
fn name_similarity(a: &str, b: &str) -> f64 {
    let mut matcher = SequenceMatcher::new(a.as_bytes(), b.as_bytes());
    f64::from(matcher.ratio())
}

impl MatchPass for FuzzyNamePass<'_> {
    fn name(&self) -> &'static str {
        "substring_fuzzy"
    }

    /// First acceptable candidate in table order wins.
    fn select<'e>(
        &self,
        player: &ReferencePlayer,
        available: &[&'e EntityPlayer],
    ) -> Option<(&'e EntityPlayer, MatchMethod)> {
        team_scope(player, available, self.config)
            .find_map(|e| self.judge(player, e).map(|method| (e, method)))
    }
}

// ---------------------------------------------------------------------------
// Pass 5: stat-line agreement within team scope
// ---------------------------------------------------------------------------

pub struct StatsPass<'c> {
    pub config: &'c MatcherConfig,
}

impl StatsPass<'_> {
    fn agrees(&self, player: &ReferencePlayer, entity: &EntityPlayer) -> bool {
        let (Some(g), Some(mp), Some(pts)) = (player.games, player.minutes, player.points) else {
            return false;
        };
        let (Some(eg), Some(emp), Some(epts)) = (entity.games_played, entity.minutes, entity.points)
        else {
            return false;
        };
        g == eg
            && (mp - emp).abs() <= self.config.minutes_tolerance
            && (pts - epts).abs() <= self.config.points_tolerance
    }
}

impl MatchPass for StatsPass<'_> {
    fn name(&self) -> &'static str {
        "stats_match_lenient"
    }

    fn select<'e>(
        &self,
        player: &ReferencePlayer,
        available: &[&'e EntityPlayer],
    ) -> Option<(&'e EntityPlayer, MatchMethod)> {
        exactly_one(team_scope(player, available, self.config).filter(|e| self.agrees(player, e)))
            .map(|e| (e, MatchMethod::StatsMatchLenient))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, name: &str, team: &str) -> ReferencePlayer {
        ReferencePlayer::new(0, Some(id.to_string()), name, team, &MatcherConfig::default())
    }

    fn refs(entities: &[EntityPlayer]) -> Vec<&EntityPlayer> {
        entities.iter().collect()
    }

    #[test]
    fn persistent_pass_ignores_unavailable_entity() {
        let store = IdentityStore::seeded(vec![("p".to_string(), 5)]);
        let pass = PersistentIdPass { store: &store };
        let ents = vec![EntityPlayer::new(6, "Someone", "ATL")];
        assert!(pass.select(&player("p", "Someone", "ATL"), &refs(&ents)).is_none());
    }

    #[test]
    fn exact_team_pass_uses_alias() {
        let config = MatcherConfig::default();
        let pass = ExactTeamNamePass { config: &config };
        let ents = vec![
            EntityPlayer::new(1, "Jane Doe", "LVA"),
            EntityPlayer::new(2, "Jane Doe", "SAN"),
        ];
        let (e, method) = pass.select(&player("j", "Jane Doe", "SAS"), &refs(&ents)).unwrap();
        assert_eq!(e.entity_id, 2);
        assert_eq!(method, MatchMethod::ExactTeamName);
    }

    #[test]
    fn exact_team_pass_defers_multi_team_rows() {
        let config = MatcherConfig::default();
        let pass = ExactTeamNamePass { config: &config };
        let ents = vec![EntityPlayer::new(1, "Jane Doe", "LVA")];
        assert!(pass.select(&player("j", "Jane Doe", "TOT"), &refs(&ents)).is_none());
    }

    #[test]
    fn ambiguous_global_name_defers() {
        let ents = vec![
            EntityPlayer::new(1, "Kim Lee", "ATL"),
            EntityPlayer::new(2, "Kim Lee", "CHI"),
        ];
        assert!(ExactNameGlobalPass
            .select(&player("k", "Kim Lee", "TOT"), &refs(&ents))
            .is_none());
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn similarity_bounds() {
        assert!(close(name_similarity("abc", "abc"), 1.0));
        assert!(close(name_similarity("abc", "xyz"), 0.0));
        assert!(close(name_similarity("abc", ""), 0.0));
    }

    #[test]
    fn similarity_counts_matching_blocks() {
        assert!(close(name_similarity("abcd", "bcde"), 0.75));
        // "bc" then "e" on either side of the longest block.
        assert!(close(name_similarity("abcxe", "ybcze"), 0.6));
        assert!(name_similarity("brittney griner", "brittany griner") > 0.85);
    }

    #[test]
    fn fuzzy_pass_ignores_empty_entity_name() {
        let config = MatcherConfig::default();
        let pass = FuzzyNamePass { config: &config };
        let ents = vec![EntityPlayer::new(1, "", "LAS")];
        assert!(pass
            .select(&player("c", "Candace Parker", "LAS"), &refs(&ents))
            .is_none());
    }

    #[test]
    fn substring_requires_long_reference_name() {
        let config = MatcherConfig::default();
        let pass = FuzzyNamePass { config: &config };

        let ents = vec![EntityPlayer::new(1, "Candace Parker Jr", "LAS")];
        let (_, method) = pass
            .select(&player("c", "Candace Parker", "LAS"), &refs(&ents))
            .unwrap();
        assert_eq!(method, MatchMethod::Substring);

        // "bo li" is too short for a substring link and too different for fuzzy.
        let ents = vec![EntityPlayer::new(2, "Bo Lindqvist", "LAS")];
        assert!(pass.select(&player("b", "Bo Li", "LAS"), &refs(&ents)).is_none());
    }

    #[test]
    fn fuzzy_pass_catches_spelling_variants() {
        let config = MatcherConfig::default();
        let pass = FuzzyNamePass { config: &config };
        let ents = vec![
            EntityPlayer::new(1, "Someone Else", "PHO"),
            EntityPlayer::new(2, "Brittany Griner", "PHO"),
        ];
        let (e, method) = pass
            .select(&player("g", "Brittney Griner", "PHO"), &refs(&ents))
            .unwrap();
        assert_eq!(e.entity_id, 2);
        assert_eq!(method, MatchMethod::Fuzzy);
    }

    #[test]
    fn fuzzy_pass_stays_on_team_unless_multi_team() {
        let config = MatcherConfig::default();
        let pass = FuzzyNamePass { config: &config };
        let ents = vec![EntityPlayer::new(1, "Brittany Griner", "PHO")];
        assert!(pass
            .select(&player("g", "Brittney Griner", "DAL"), &refs(&ents))
            .is_none());
        assert!(pass
            .select(&player("g", "Brittney Griner", "TOT"), &refs(&ents))
            .is_some());
    }

    #[test]
    fn stats_pass_needs_unique_agreement() {
        let config = MatcherConfig::default();
        let pass = StatsPass { config: &config };
        let p = player("s", "Totally Different", "MIN")
            .with_stats(Some(30.0), Some(600.0), Some(250.0));

        let ents = vec![
            EntityPlayer::new(1, "X", "MIN").with_stats(Some(30.0), Some(604.0), Some(251.5)),
            EntityPlayer::new(2, "Y", "MIN").with_stats(Some(29.0), Some(600.0), Some(250.0)),
        ];
        let (e, method) = pass.select(&p, &refs(&ents)).unwrap();
        assert_eq!(e.entity_id, 1);
        assert_eq!(method, MatchMethod::StatsMatchLenient);

        let ents = vec![
            EntityPlayer::new(1, "X", "MIN").with_stats(Some(30.0), Some(604.0), Some(251.5)),
            EntityPlayer::new(2, "Y", "MIN").with_stats(Some(30.0), Some(598.0), Some(249.0)),
        ];
        assert!(pass.select(&p, &refs(&ents)).is_none());
    }

    #[test]
    fn run_pass_never_reuses_an_entity() {
        let a = player("a", "Kim Lee", "ATL");
        let b = player("b", "Kim Lee", "ATL");
        let ents = vec![EntityPlayer::new(1, "Kim Lee", "ATL")];
        let result = run_pass(&ExactNameGlobalPass, vec![&a, &b], &ents, &HashSet::new());
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.unresolved.len(), 1);
        assert_eq!(result.unresolved[0].player_id.as_deref(), Some("b"));
    }

    #[test]
    fn run_pass_skips_consumed_entities() {
        let a = player("a", "Kim Lee", "ATL");
        let ents = vec![EntityPlayer::new(1, "Kim Lee", "ATL")];
        let consumed = HashSet::from([1]);
        let result = run_pass(&ExactNameGlobalPass, vec![&a], &ents, &consumed);
        assert!(result.matched.is_empty());
        assert_eq!(result.unresolved.len(), 1);
    }
}
