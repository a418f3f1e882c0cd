//! Per-match evaluation: resolve the teams, find their statistics and
//! price the match's markets.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::db::models::{Leg, MatchRecord, MatchSummary};
use crate::sources::{TeamResolver, TeamStatsSource};

use super::cache::TeamStatsCache;
use super::stats::TeamStats;
use super::text::normalize_name;
use super::value::evaluate_markets;

pub struct MatchEvaluator {
    resolver: Arc<dyn TeamResolver>,
    stats_source: Arc<dyn TeamStatsSource>,
}

impl MatchEvaluator {
    pub fn new(resolver: Arc<dyn TeamResolver>, stats_source: Arc<dyn TeamStatsSource>) -> Self {
        MatchEvaluator {
            resolver,
            stats_source,
        }
    }

    /// Home and away names, or `None` when no resolver knows them.
    /// Resolver failures count as unknown.
    pub async fn resolve_teams(&self, record: &MatchRecord) -> Option<(String, String)> {
        match self.resolver.resolve_teams(record).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!("{}: team resolution via {} failed: {}", record.match_id(), self.resolver.name(), e);
                None
            }
        }
    }

    /// Cached statistics for `team`, fetching and caching them on a miss.
    async fn team_stats(&self, team: &str, cache: &mut TeamStatsCache) -> Option<TeamStats> {
        if let Some(stats) = cache.get(team) {
            return Some(stats.clone());
        }
        let key = normalize_name(team);
        if key.is_empty() {
            return None;
        }
        match self.stats_source.fetch_team_stats(&key).await {
            Ok(Some(stats)) => {
                debug!("fetched stats for {} from {}", key, self.stats_source.name());
                cache.insert(&key, stats.clone());
                Some(stats)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("stats lookup for {} via {} failed: {}", key, self.stats_source.name(), e);
                None
            }
        }
    }

    /// Value legs of one match. `cache` is read first and enriched with
    /// anything fetched from the stats source.
    pub async fn evaluate_markets_for_match(
        &self,
        record: &MatchRecord,
        cache: &mut TeamStatsCache,
        value_margin: f64,
    ) -> Vec<Leg> {
        let teams = self.resolve_teams(record).await;
        let (home, away) = self.team_pair(record, teams.as_ref(), cache).await;
        price(record, home.as_ref(), away.as_ref(), value_margin)
    }

    /// Same as [`MatchEvaluator::evaluate_markets_for_match`], wrapped with
    /// the resolved names and a score.
    pub async fn summarize_match(
        &self,
        record: &MatchRecord,
        cache: &mut TeamStatsCache,
        value_margin: f64,
    ) -> MatchSummary {
        let teams = self.resolve_teams(record).await;
        let (home, away) = self.team_pair(record, teams.as_ref(), cache).await;
        summary(record, teams, price(record, home.as_ref(), away.as_ref(), value_margin))
    }

    /// [`MatchEvaluator::summarize_match`] over a cache shared by concurrent
    /// matches. The lock is held through the statistics lookup, so a team
    /// missing from the cache is fetched once per run.
    pub async fn summarize_match_shared(
        &self,
        record: &MatchRecord,
        cache: &Mutex<TeamStatsCache>,
        value_margin: f64,
    ) -> MatchSummary {
        let teams = self.resolve_teams(record).await;
        let (home, away) = {
            let mut cache = cache.lock().await;
            self.team_pair(record, teams.as_ref(), &mut cache).await
        };
        summary(record, teams, price(record, home.as_ref(), away.as_ref(), value_margin))
    }

    async fn team_pair(
        &self,
        record: &MatchRecord,
        teams: Option<&(String, String)>,
        cache: &mut TeamStatsCache,
    ) -> (Option<TeamStats>, Option<TeamStats>) {
        match teams {
            Some((home, away)) => (
                self.team_stats(home, cache).await,
                self.team_stats(away, cache).await,
            ),
            None => {
                debug!("{}: teams unknown, pricing without statistics", record.match_id());
                (None, None)
            }
        }
    }
}

fn price(record: &MatchRecord, home: Option<&TeamStats>, away: Option<&TeamStats>, value_margin: f64) -> Vec<Leg> {
    evaluate_markets(&record.match_id(), &record.markets, home, away, value_margin)
        .into_iter()
        .map(|leg| Leg {
            match_url: record.page_url().map(ToString::to_string),
            ..leg
        })
        .collect()
}

fn summary(record: &MatchRecord, teams: Option<(String, String)>, legs: Vec<Leg>) -> MatchSummary {
    let (home, away) = match teams {
        Some((home, away)) => (Some(home), Some(away)),
        None => (None, None),
    };
    MatchSummary::new(record.match_id(), home, away, legs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::db::models::RawMarket;
    use crate::engine::stats::summarize_numeric_stats;
    use crate::engine::value::DEFAULT_VALUE_MARGIN;
    use crate::sources::{NoStats, RecordTeams, SourceError};

    struct StubStats {
        teams: HashMap<String, TeamStats>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TeamStatsSource for StubStats {
        async fn fetch_team_stats(&self, team: &str) -> Result<Option<TeamStats>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.teams.get(team).cloned())
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    struct BrokenStats;

    #[async_trait]
    impl TeamStatsSource for BrokenStats {
        async fn fetch_team_stats(&self, _team: &str) -> Result<Option<TeamStats>, SourceError> {
            Err(SourceError::Payload {
                source_name: "broken".into(),
                reason: "down".into(),
            })
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn stats(v: serde_json::Value) -> TeamStats {
        summarize_numeric_stats(v.as_object().unwrap())
    }

    fn record() -> MatchRecord {
        MatchRecord {
            id: Some("m1".into()),
            home: Some("Santos".into()),
            away: Some("Ituano".into()),
            markets: vec![
                RawMarket {
                    name: Some("Mais de 2.5 gols".into()),
                    odd: Some(json!(1.9)),
                    bookmaker: Some("betano".into()),
                    ..Default::default()
                },
                RawMarket {
                    market_type: Some("1X2".into()),
                    selection: Some("Casa".into()),
                    odd: Some(json!("1.60")),
                    bookmaker: Some("betano".into()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn cache_hits_skip_the_stats_source() {
        let source = Arc::new(StubStats {
            teams: HashMap::new(),
            calls: AtomicUsize::new(0),
        });
        let evaluator = MatchEvaluator::new(Arc::new(RecordTeams), source.clone());

        let mut cache = TeamStatsCache::new();
        cache.insert("Santos", stats(json!({"goals": 2.0, "goals_for": 2.0, "goals_against": 0.5})));
        cache.insert("Ituano", stats(json!({"goals": 1.5, "goals_for": 0.6, "goals_against": 1.8})));

        let legs = evaluator
            .evaluate_markets_for_match(&record(), &mut cache, DEFAULT_VALUE_MARGIN)
            .await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(legs.iter().any(|l| l.market == "GOALS_OVER@2.5"));
        assert!(legs.iter().all(|l| l.match_id == "m1"));
    }

    #[tokio::test]
    async fn misses_are_fetched_once_and_cached() {
        let mut teams = HashMap::new();
        teams.insert("santos".to_string(), stats(json!({"goals": 2.0})));
        teams.insert("ituano".to_string(), stats(json!({"goals": 1.5})));
        let source = Arc::new(StubStats {
            teams,
            calls: AtomicUsize::new(0),
        });
        let evaluator = MatchEvaluator::new(Arc::new(RecordTeams), source.clone());

        let mut cache = TeamStatsCache::new();
        let legs = evaluator
            .evaluate_markets_for_match(&record(), &mut cache, DEFAULT_VALUE_MARGIN)
            .await;
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].market, "GOALS_OVER@2.5");
        assert!(cache.contains("Santos") && cache.contains("Ituano"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        evaluator
            .evaluate_markets_for_match(&record(), &mut cache, DEFAULT_VALUE_MARGIN)
            .await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_teams_or_failing_source_yield_nothing() {
        let evaluator = MatchEvaluator::new(Arc::new(RecordTeams), Arc::new(BrokenStats));
        let mut cache = TeamStatsCache::new();
        let summary = evaluator.summarize_match(&record(), &mut cache, DEFAULT_VALUE_MARGIN).await;
        assert!(summary.legs.is_empty());
        assert_eq!(summary.reason, "no clear value legs");
        assert_eq!(summary.home.as_deref(), Some("Santos"));
        assert!(cache.is_empty());

        let anonymous = MatchRecord {
            home: None,
            away: None,
            ..record()
        };
        let evaluator = MatchEvaluator::new(Arc::new(RecordTeams), Arc::new(NoStats));
        let summary = evaluator.summarize_match(&anonymous, &mut cache, DEFAULT_VALUE_MARGIN).await;
        assert_eq!(summary.home, None);
        assert_eq!(summary.score, 0.0);
    }
}
