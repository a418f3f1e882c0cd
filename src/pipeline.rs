//! One evaluation run over a scraped document, plus the settlement and
//! import jobs that work on the same database.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::db::models::{BetStatus, FinalScore, Leg, MatchSummary, Parlay, ScrapedDocument};
use crate::db::Database;
use crate::engine::cache::TeamStatsCache;
use crate::engine::classifier::MarketDescriptor;
use crate::engine::evaluator::MatchEvaluator;
use crate::engine::parlay::{generate_parlays, search_size, ParlaySettings};
use crate::engine::settlement::{grade_leg, Outcome};
use crate::engine::stats::summarize_numeric_stats;
use crate::engine::value::DEFAULT_VALUE_MARGIN;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub value_margin: f64,
    /// Legs priced below this are kept out of parlays
    pub min_leg_odd: f64,
    /// Legs priced above this are kept out of parlays
    pub max_leg_odd: f64,
    pub parlay: ParlaySettings,
    /// Largest leg pool handed to the parlay search
    pub max_parlay_pool: usize,
    pub concurrency: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            value_margin: DEFAULT_VALUE_MARGIN,
            min_leg_odd: 1.1,
            max_leg_odd: 2.0,
            parlay: ParlaySettings::default(),
            max_parlay_pool: 40,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub matches: Vec<MatchSummary>,
    pub value_legs: Vec<Leg>,
    pub parlays: Vec<Parlay>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleReport {
    pub won: usize,
    pub lost: usize,
    /// Pending bets with a final score that could not be graded
    pub ungradable: usize,
    /// Pending bets with no final score yet
    pub waiting: usize,
}

pub fn load_document(path: &Path) -> Result<ScrapedDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_scores(path: &Path) -> Result<Vec<FinalScore>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Run cache built from the team records of a document.
pub fn seed_cache(doc: &ScrapedDocument) -> TeamStatsCache {
    let mut cache = TeamStatsCache::new();
    for team in &doc.teams {
        if cache.contains(&team.team_name) {
            debug!("duplicate team record for {}, keeping the first", team.team_name);
            continue;
        }
        cache.insert(&team.team_name, summarize_numeric_stats(&team.stats));
    }
    cache
}

/// Legs eligible for parlays: inside the odd window, best delta first,
/// capped at `max_parlay_pool`.
pub fn parlay_pool(legs: &[Leg], settings: &ScanSettings) -> Vec<Leg> {
    let mut pool: Vec<Leg> = legs
        .iter()
        .filter(|l| l.odd >= settings.min_leg_odd && l.odd <= settings.max_leg_odd)
        .cloned()
        .collect();
    pool.sort_by(|a, b| b.delta.total_cmp(&a.delta));
    if pool.len() > settings.max_parlay_pool {
        warn!(
            "parlay pool truncated from {} to {} legs ({} combinations otherwise)",
            pool.len(),
            settings.max_parlay_pool,
            search_size(pool.len(), settings.parlay.max_legs)
        );
        pool.truncate(settings.max_parlay_pool);
    }
    pool
}

/// Evaluate every match of the document and build parlays from the value
/// legs. `cache` is enriched with whatever the evaluator fetched.
///
/// Matches run `settings.concurrency` at a time over one shared cache, so
/// a team fetched for one match is reused by every later match.
pub async fn run_scan(
    doc: &ScrapedDocument,
    evaluator: &MatchEvaluator,
    cache: &mut TeamStatsCache,
    settings: &ScanSettings,
) -> ScanReport {
    let seeded = cache.len();
    let shared = Mutex::new(std::mem::take(cache));
    let matches: Vec<MatchSummary> = stream::iter(doc.matches.iter())
        .map(|record| evaluator.summarize_match_shared(record, &shared, settings.value_margin))
        .buffered(settings.concurrency.max(1))
        .collect()
        .await;
    *cache = shared.into_inner();

    let fetched = cache.len().saturating_sub(seeded);
    if fetched > 0 {
        info!("{} team(s) fetched on demand", fetched);
    }

    let value_legs: Vec<Leg> = matches.iter().flat_map(|m| m.legs.iter().cloned()).collect();
    let pool = parlay_pool(&value_legs, settings);
    let parlays = generate_parlays(&pool, &settings.parlay);
    info!(
        "{} matches, {} value legs, {} in parlay pool, {} parlays",
        matches.len(),
        value_legs.len(),
        pool.len(),
        parlays.len()
    );

    ScanReport {
        generated_at: Utc::now(),
        matches,
        value_legs,
        parlays,
    }
}

pub fn write_report(report: &ScanReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Grade every pending bet that has a final score.
pub fn settle_pending(db: &Database, scores: &[FinalScore]) -> Result<SettleReport> {
    let mut report = SettleReport::default();
    for bet in db.list_pending_bets()? {
        let score = scores.iter().find(|s| {
            s.match_id == bet.match_id || bet.match_url.as_deref() == Some(s.match_id.as_str())
        });
        let Some(score) = score else {
            report.waiting += 1;
            continue;
        };
        let outcome = MarketDescriptor::from_label(&bet.market, bet.selection)
            .and_then(|market| grade_leg(&market, score));
        let result = format!("{}-{}", score.home_goals, score.away_goals);
        match outcome {
            Some(Outcome::Won) => {
                db.update_bet_status(bet.id, BetStatus::Won, Some(&result))?;
                report.won += 1;
            }
            Some(Outcome::Lost) => {
                db.update_bet_status(bet.id, BetStatus::Lost, Some(&result))?;
                report.lost += 1;
            }
            None => {
                debug!("bet {} ({}) cannot be graded from {}", bet.id, bet.market, result);
                report.ungradable += 1;
            }
        }
    }
    Ok(report)
}

/// Import a `{team: {stat: value}}` document into the stats table.
/// Returns the number of teams written.
pub fn import_team_stats(db: &Database, path: &Path, season: &str) -> Result<usize> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let teams: Map<String, Value> =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut written = 0;
    for (team, stats) in &teams {
        let Some(stats) = stats.as_object() else {
            warn!("skipping {}: statistics are not an object", team);
            continue;
        };
        match db.upsert_team_stats(team, season, stats) {
            Ok(()) => written += 1,
            Err(e) => warn!("skipping {}: {}", team, e),
        }
    }
    Ok(written)
}
