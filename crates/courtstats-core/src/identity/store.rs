// Cross-season identity memory: reference player_id -> EntityId.

use std::collections::HashMap;

/// Links learned while resolving earlier seasons. Owned by one resolver run;
/// a fresh store is empty. A season that links a player to a different
/// entity replaces the earlier link.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    links: HashMap<String, i64>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate from a previously written identity map. When the map
    /// lists a player more than once the first row wins.
    pub fn seeded<I>(links: I) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut store = Self::new();
        for (player_id, entity_id) in links {
            store.links.entry(player_id).or_insert(entity_id);
        }
        store
    }

    pub fn get(&self, player_id: &str) -> Option<i64> {
        self.links.get(player_id).copied()
    }

    /// Remember a link, replacing any earlier one for the player.
    pub fn record(&mut self, player_id: &str, entity_id: i64) {
        self.links.insert(player_id.to_string(), entity_id);
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
