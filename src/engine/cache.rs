//! Per-run team statistics lookup.
//!
//! The cache is owned by whoever drives an evaluation run and passed down
//! explicitly. It is a plain map; concurrent runs share it behind a
//! `tokio::sync::Mutex`.

use std::collections::HashMap;

use super::stats::TeamStats;
use super::text::normalize_name;

#[derive(Debug, Clone, Default)]
pub struct TeamStatsCache {
    /// normalized team name → summarized statistics
    entries: HashMap<String, TeamStats>,
}

impl TeamStatsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up by display or normalized name.
    pub fn get(&self, team: &str) -> Option<&TeamStats> {
        self.entries.get(&normalize_name(team))
    }

    pub fn contains(&self, team: &str) -> bool {
        self.entries.contains_key(&normalize_name(team))
    }

    /// Store statistics under the normalized name, replacing any previous
    /// entry. Empty names are ignored.
    pub fn insert(&mut self, team: &str, stats: TeamStats) {
        let key = normalize_name(team);
        if key.is_empty() {
            return;
        }
        self.entries.insert(key, stats);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
