use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::engine::classifier::{MarketDescriptor, Selection};

/// A bookmaker market as scraped, before classification.
///
/// Every field is optional; scraped pages are noisy and the classifier
/// works with whatever text is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMarket {
    #[serde(default, deserialize_with = "lenient_text")]
    pub market_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub selection: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub context: Option<String>,
    /// Decimal odd, as a JSON number or a numeric string.
    #[serde(default)]
    pub odd: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub bookmaker: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source_url: Option<String>,
}

impl RawMarket {
    /// Parsed decimal odd. `None` unless it is a finite, positive number.
    pub fn decimal_odd(&self) -> Option<f64> {
        let odd = match self.odd.as_ref()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
            _ => return None,
        };
        (odd.is_finite() && odd > 0.0).then_some(odd)
    }

    /// Bookmaker identifier, falling back to the scraping source name.
    pub fn bookmaker_name(&self) -> Option<&str> {
        self.bookmaker
            .as_deref()
            .or(self.source_name.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// One match as handed over by the scraping layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub match_url: Option<String>,
    /// Pre-supplied home team display name
    #[serde(default, alias = "home_team", alias = "home_name")]
    pub home: Option<String>,
    /// Pre-supplied away team display name
    #[serde(default, alias = "away_team", alias = "away_name")]
    pub away: Option<String>,
    #[serde(default)]
    pub markets: Vec<RawMarket>,
}

impl MatchRecord {
    /// Opaque match identifier used to tag legs.
    pub fn match_id(&self) -> String {
        self.id
            .as_deref()
            .or(self.source_url.as_deref())
            .or(self.match_url.as_deref())
            .map(ToString::to_string)
            .unwrap_or_else(|| {
                format!(
                    "{} vs {}",
                    self.home.as_deref().unwrap_or("?"),
                    self.away.as_deref().unwrap_or("?")
                )
            })
    }

    /// URL of the match page, if any.
    pub fn page_url(&self) -> Option<&str> {
        self.source_url.as_deref().or(self.match_url.as_deref())
    }
}

/// Team statistics as scraped from a stats page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team_name: String,
    #[serde(flatten)]
    pub stats: Map<String, Value>,
}

/// Input document of one evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedDocument {
    #[serde(default)]
    pub teams: Vec<TeamRecord>,
    #[serde(default)]
    pub matches: Vec<MatchRecord>,
}

/// A single value bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    /// Decimal odd offered by the bookmaker
    pub odd: f64,
    /// Estimated probability minus implied probability
    pub delta: f64,
    /// `"{KIND}@{LINE}"` or `"{KIND}"`
    pub market: String,
    pub descriptor: MarketDescriptor,
    pub bookmaker: Option<String>,
    #[serde(rename = "match")]
    pub match_id: String,
    /// Page the match was scraped from
    #[serde(default)]
    pub match_url: Option<String>,
}

/// A combination of legs whose odds multiply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parlay {
    pub legs: Vec<Leg>,
    /// Product of leg odds
    pub odd: f64,
    /// Sum of leg deltas
    pub total_delta: f64,
}

/// Per-match evaluation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    #[serde(rename = "match")]
    pub match_id: String,
    pub home: Option<String>,
    pub away: Option<String>,
    /// Largest leg delta, 0 when no leg qualified
    pub score: f64,
    pub reason: String,
    pub legs: Vec<Leg>,
}

impl MatchSummary {
    pub fn new(match_id: String, home: Option<String>, away: Option<String>, legs: Vec<Leg>) -> Self {
        let (score, reason) = if legs.is_empty() {
            (0.0, "no clear value legs".to_string())
        } else {
            let best = legs.iter().map(|l| l.delta).fold(f64::MIN, f64::max);
            (best, format!("value_legs={}", legs.len()))
        };
        MatchSummary {
            match_id,
            home,
            away,
            score,
            reason,
            legs,
        }
    }
}

/// "PENDING" | "WON" | "LOST"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "PENDING",
            BetStatus::Won => "WON",
            BetStatus::Lost => "LOST",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(BetStatus::Pending),
            "WON" => Some(BetStatus::Won),
            "LOST" => Some(BetStatus::Lost),
            _ => None,
        }
    }
}

/// A persisted candidate leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub id: i64,
    pub match_id: String,
    pub market: String,
    pub selection: Option<Selection>,
    pub bookmaker: Option<String>,
    pub odd: f64,
    pub delta: f64,
    pub created_at: DateTime<Utc>,
    pub status: BetStatus,
    /// Final score as "H-A" once graded
    pub result: Option<String>,
    pub match_url: Option<String>,
}

/// Aggregate outcome counts over the bets table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetStats {
    pub total: i64,
    pub won: i64,
    pub lost: i64,
    pub pct_won: f64,
}

/// One row of the team statistics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTeamStats {
    /// Normalized team name
    pub team: String,
    pub season: String,
    pub matches_played: i64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub goals_for: i64,
    pub goals_against: i64,
    /// Statistics exactly as imported
    pub raw: Map<String, Value>,
}

/// Final result of a match, used to grade pending bets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    #[serde(rename = "match")]
    pub match_id: String,
    pub home_goals: u32,
    pub away_goals: u32,
    #[serde(default)]
    pub home_corners: Option<u32>,
    #[serde(default)]
    pub away_corners: Option<u32>,
}

/// Accept strings, numbers and booleans as text; anything else is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_market_accepts_numeric_selection_and_string_odd() {
        let m: RawMarket = serde_json::from_value(json!({
            "market_type": "1X2",
            "selection": 1,
            "odd": "2,10",
            "source_name": "betano"
        }))
        .unwrap();
        assert_eq!(m.selection.as_deref(), Some("1"));
        assert_eq!(m.decimal_odd(), Some(2.1));
        assert_eq!(m.bookmaker_name(), Some("betano"));
    }

    #[test]
    fn invalid_odds_are_absent() {
        for odd in [json!("n/a"), json!(0), json!(-1.5), json!(null), json!([2.0])] {
            let m = RawMarket {
                odd: Some(odd.clone()),
                ..Default::default()
            };
            assert_eq!(m.decimal_odd(), None, "odd {odd} should be rejected");
        }
    }

    #[test]
    fn match_id_prefers_explicit_then_urls() {
        let mut m = MatchRecord {
            match_url: Some("https://x/match/a-b/1".into()),
            ..Default::default()
        };
        assert_eq!(m.match_id(), "https://x/match/a-b/1");
        m.source_url = Some("https://y/2".into());
        assert_eq!(m.match_id(), "https://y/2");
        m.id = Some("m-1".into());
        assert_eq!(m.match_id(), "m-1");
    }

    #[test]
    fn team_record_flattens_stats() {
        let t: TeamRecord = serde_json::from_value(json!({
            "team_name": "Santos",
            "goals": [1, 2, 3],
            "corners": "5.5"
        }))
        .unwrap();
        assert_eq!(t.team_name, "Santos");
        assert_eq!(t.stats.len(), 2);
        assert!(!t.stats.contains_key("team_name"));
    }

    #[test]
    fn summary_score_is_best_delta() {
        let s = MatchSummary::new("m".into(), None, None, vec![]);
        assert_eq!(s.score, 0.0);
        assert_eq!(s.reason, "no clear value legs");
    }
}
