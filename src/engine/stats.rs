//! Team statistic normalization and keyword-driven extraction.
//!
//! Scraped statistic dictionaries have no fixed schema: keys come in
//! English or Portuguese, values are numbers, numeric strings, lists of
//! per-game samples or plain garbage. [`summarize_numeric_stats`] turns
//! what it can into numbers and leaves the rest untouched; the extractors
//! below then look for semantic quantities by key name.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Candidate keys for the expected goals total.
pub const GOAL_KEYS: &[&str] = &["goals", "goals per game", "gols", "gols por jogo", "avg goals"];
/// Candidate keys for the expected corners total.
pub const CORNER_KEYS: &[&str] = &["corners", "escanteios", "escanteio"];

const CORNER_FIELDS: &[&str] = &["corners", "corner", "escanteios", "escanteio"];
const SHOT_FIELDS: &[&str] = &["shots_on_target", "shots", "chutes", "chutes a gol", "chutes_no_alvo"];
const GOALS_FOR_FALLBACK: &[&str] = &["goals_for_avg", "gfa", "goals_for"];
const GOALS_AGAINST_FALLBACK: &[&str] = &["goals_against_avg", "gaa", "goals_against"];

/// Summarized statistics of one team. Numeric entries are stored as JSON
/// numbers; anything unparsable is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamStats(Map<String, Value>);

impl TeamStats {
    pub fn new(values: Map<String, Value>) -> Self {
        TeamStats(values)
    }

    /// Numeric value stored under exactly `key`.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First numeric hit over `candidates`: exact key first, then any key
    /// containing the candidate (case-insensitive), in document order.
    pub fn lookup(&self, candidates: &[&str]) -> Option<f64> {
        candidates.iter().find_map(|c| {
            let needle = c.to_lowercase();
            self.number(c).or_else(|| {
                self.0
                    .iter()
                    .filter(|(k, _)| k.to_lowercase().contains(&needle))
                    .find_map(|(_, v)| v.as_f64())
            })
        })
    }

    /// First candidate present under its exact key, else 0.
    fn exact_field(&self, candidates: &[&str]) -> f64 {
        candidates
            .iter()
            .find_map(|c| self.number(c))
            .unwrap_or(0.0)
    }

    pub fn corners(&self) -> f64 {
        self.exact_field(CORNER_FIELDS)
    }

    pub fn shots(&self) -> f64 {
        self.exact_field(SHOT_FIELDS)
    }

    /// Goals-for minus goals-against per game. A missing side counts as 0.
    pub fn goal_balance(&self) -> f64 {
        let mut scored = None;
        let mut conceded = None;
        for (key, value) in &self.0 {
            let k = key.to_lowercase();
            if !(k.contains("goal") || k.contains("gol")) {
                continue;
            }
            let Some(v) = value.as_f64() else { continue };
            if k.contains("against") || k.contains("contra") || k.contains("conced") {
                conceded = Some(v);
            } else {
                scored = Some(v);
            }
        }
        let scored = scored.or_else(|| GOALS_FOR_FALLBACK.iter().find_map(|k| self.number(k)));
        let conceded =
            conceded.or_else(|| GOALS_AGAINST_FALLBACK.iter().find_map(|k| self.number(k)));
        scored.unwrap_or(0.0) - conceded.unwrap_or(0.0)
    }
}

impl FromIterator<(String, Value)> for TeamStats {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        TeamStats(iter.into_iter().collect())
    }
}

/// Normalize a raw statistic mapping.
///
/// - numbers are kept
/// - lists become the mean of their numeric entries (null when none are numeric)
/// - strings are parsed as numbers when possible, otherwise passed through
/// - anything else is passed through
pub fn summarize_numeric_stats(raw: &Map<String, Value>) -> TeamStats {
    raw.iter()
        .map(|(k, v)| (k.clone(), summarize_value(v)))
        .collect()
}

fn summarize_value(value: &Value) -> Value {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        Value::Array(items) => mean(items)
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

fn mean(items: &[Value]) -> Option<f64> {
    let values: Vec<f64> = items.iter().filter_map(numeric_entry).collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn numeric_entry(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Expected combined count (the Poisson λ) of both teams, never negative.
/// A team without a matching statistic contributes 0.
pub fn expected_total(home: Option<&TeamStats>, away: Option<&TeamStats>, candidates: &[&str]) -> f64 {
    let side = |stats: Option<&TeamStats>| stats.and_then(|s| s.lookup(candidates)).unwrap_or(0.0);
    (side(home) + side(away)).max(0.0)
}
