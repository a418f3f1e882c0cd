use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

use crate::engine::classifier::Selection;
use crate::engine::stats::{summarize_numeric_stats, TeamStats};
use crate::engine::text::normalize_name;
use crate::sources::{SourceError, TeamStatsSource};

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("Failed to open database {}", path))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("database mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Bets ──────────────────────────────────────────────────────────────────

    /// Persist value legs as pending bets. Returns the number of rows written.
    pub fn save_candidates(&self, legs: &[Leg]) -> Result<usize> {
        if legs.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO bets (match, market, selection, bookmaker, odd, delta,
                                   created_at, status, match_url)
                 VALUES (?1,?2,?3,?4,?5,?6,?7,'PENDING',?8)",
            )?;
            for leg in legs {
                stmt.execute(params![
                    leg.match_id,
                    leg.market,
                    leg.descriptor.selection.map(|s| s.as_str()),
                    leg.bookmaker,
                    leg.odd,
                    leg.delta,
                    now,
                    leg.match_url,
                ])?;
            }
        }
        tx.commit()?;
        Ok(legs.len())
    }

    /// Bets not graded yet, oldest first
    pub fn list_pending_bets(&self) -> Result<Vec<BetRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, match, market, selection, bookmaker, odd, delta,
                    created_at, status, result, match_url
             FROM bets WHERE status='PENDING' ORDER BY id ASC",
        )?;
        let bets = stmt
            .query_map([], map_bet)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bets)
    }

    pub fn update_bet_status(&self, id: i64, status: BetStatus, result: Option<&str>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE bets SET status=?1, result=?2 WHERE id=?3",
            params![status.as_str(), result, id],
        )?;
        Ok(())
    }

    /// Outcome counts over every bet ever saved
    pub fn bet_stats(&self) -> Result<BetStats> {
        let conn = self.lock()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM bets", [], |r| r.get(0))?;
        let won: i64 = conn.query_row("SELECT COUNT(*) FROM bets WHERE status='WON'", [], |r| r.get(0))?;
        let lost: i64 = conn.query_row("SELECT COUNT(*) FROM bets WHERE status='LOST'", [], |r| r.get(0))?;
        let pct_won = if total > 0 {
            won as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Ok(BetStats {
            total,
            won,
            lost,
            pct_won,
        })
    }

    // ── Team stats ────────────────────────────────────────────────────────────

    /// Insert or replace the statistics of a team for one season.
    /// The team is stored under its normalized name.
    pub fn upsert_team_stats(&self, team: &str, season: &str, stats: &Map<String, Value>) -> Result<()> {
        let key = normalize_name(team);
        if key.is_empty() {
            anyhow::bail!("team name {:?} is empty after normalization", team);
        }
        let count = |field: &str| -> i64 {
            stats
                .get(field)
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
                .unwrap_or(0)
        };
        let raw = serde_json::to_string(stats)?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO team_stats (team, season, matches_played, wins, draws, losses,
                                     goals_for, goals_against, raw)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
             ON CONFLICT(team, season) DO UPDATE SET
                matches_played=excluded.matches_played,
                wins=excluded.wins,
                draws=excluded.draws,
                losses=excluded.losses,
                goals_for=excluded.goals_for,
                goals_against=excluded.goals_against,
                raw=excluded.raw",
            params![
                key,
                season,
                count("matches_played"),
                count("wins"),
                count("draws"),
                count("losses"),
                count("goals_for"),
                count("goals_against"),
                raw,
            ],
        )?;
        Ok(())
    }

    /// Statistics of a team for a season, or for its latest season.
    pub fn get_team_stats(&self, team: &str, season: Option<&str>) -> Result<Option<StoredTeamStats>> {
        let key = normalize_name(team);
        let conn = self.lock()?;
        let row = match season {
            Some(season) => conn
                .query_row(
                    &format!("{} WHERE team=?1 AND season=?2", TEAM_STATS_SELECT),
                    params![key, season],
                    map_team_stats,
                )
                .optional()?,
            None => conn
                .query_row(
                    &format!("{} WHERE team=?1 ORDER BY season DESC LIMIT 1", TEAM_STATS_SELECT),
                    params![key],
                    map_team_stats,
                )
                .optional()?,
        };
        Ok(row)
    }
}

#[async_trait]
impl TeamStatsSource for Database {
    async fn fetch_team_stats(&self, team: &str) -> Result<Option<TeamStats>, SourceError> {
        let db = self.clone();
        let team = team.to_string();
        let stored = tokio::task::spawn_blocking(move || db.get_team_stats(&team, None))
            .await
            .map_err(|e| SourceError::Database(anyhow!(e)))?
            .map_err(SourceError::Database)?;
        Ok(stored.map(|s| summarize_numeric_stats(&s.raw)))
    }

    fn name(&self) -> &str {
        "stats-db"
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

const TEAM_STATS_SELECT: &str = "SELECT team, season, matches_played, wins, draws, losses,
        goals_for, goals_against, raw FROM team_stats";

fn map_bet(row: &rusqlite::Row) -> rusqlite::Result<BetRecord> {
    let selection: Option<String> = row.get(3)?;
    let status: String = row.get(8)?;
    Ok(BetRecord {
        id: row.get(0)?,
        match_id: row.get(1)?,
        market: row.get(2)?,
        selection: selection.as_deref().and_then(Selection::parse),
        bookmaker: row.get(4)?,
        odd: row.get(5)?,
        delta: row.get(6)?,
        created_at: row.get(7)?,
        status: BetStatus::parse(&status).unwrap_or(BetStatus::Pending),
        result: row.get(9)?,
        match_url: row.get(10)?,
    })
}

fn map_team_stats(row: &rusqlite::Row) -> rusqlite::Result<StoredTeamStats> {
    let raw: Option<String> = row.get(8)?;
    Ok(StoredTeamStats {
        team: row.get(0)?,
        season: row.get(1)?,
        matches_played: row.get(2)?,
        wins: row.get(3)?,
        draws: row.get(4)?,
        losses: row.get(5)?,
        goals_for: row.get(6)?,
        goals_against: row.get(7)?,
        raw: raw
            .and_then(|r| serde_json::from_str(&r).ok())
            .unwrap_or_default(),
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    match       TEXT    NOT NULL,
    market      TEXT    NOT NULL,
    selection   TEXT,
    bookmaker   TEXT,
    odd         REAL    NOT NULL,
    delta       REAL    NOT NULL,
    created_at  TEXT    NOT NULL,
    status      TEXT    NOT NULL DEFAULT 'PENDING',
    result      TEXT,
    match_url   TEXT
);

CREATE TABLE IF NOT EXISTS team_stats (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    team            TEXT    NOT NULL,
    season          TEXT    NOT NULL,
    matches_played  INTEGER NOT NULL DEFAULT 0,
    wins            INTEGER NOT NULL DEFAULT 0,
    draws           INTEGER NOT NULL DEFAULT 0,
    losses          INTEGER NOT NULL DEFAULT 0,
    goals_for       INTEGER NOT NULL DEFAULT 0,
    goals_against   INTEGER NOT NULL DEFAULT 0,
    raw             TEXT,
    UNIQUE(team, season)
);

CREATE INDEX IF NOT EXISTS idx_bets_status ON bets(status);
CREATE INDEX IF NOT EXISTS idx_team_stats_team ON team_stats(team);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    use crate::engine::classifier::{MarketDescriptor, MarketKind};

    fn leg(market: MarketDescriptor, odd: f64) -> Leg {
        Leg {
            odd,
            delta: 0.08,
            market: market.label(),
            descriptor: market,
            bookmaker: Some("betano".into()),
            match_id: "santos-ituano".into(),
            match_url: Some("https://site.com/match/santos-ituano/1".into()),
        }
    }

    #[test]
    fn bets_round_trip_and_grading() {
        let db = Database::open(":memory:").unwrap();
        let over = MarketDescriptor {
            kind: MarketKind::GoalsOver,
            line: Some(2.5),
            selection: None,
        };
        let home = MarketDescriptor {
            kind: MarketKind::OneXTwo,
            line: None,
            selection: Some(Selection::Home),
        };
        assert_eq!(db.save_candidates(&[leg(over, 1.8), leg(home, 2.1)]).unwrap(), 2);
        assert_eq!(db.save_candidates(&[]).unwrap(), 0);

        let pending = db.list_pending_bets().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].market, "GOALS_OVER@2.5");
        assert_eq!(pending[0].match_id, "santos-ituano");
        assert_eq!(pending[0].match_url.as_deref(), Some("https://site.com/match/santos-ituano/1"));
        assert_eq!(pending[0].selection, None);
        assert_eq!(pending[1].market, "1X2");
        assert_eq!(pending[1].selection, Some(Selection::Home));
        assert_eq!(pending[1].status, BetStatus::Pending);
        assert_relative_eq!(pending[1].odd, 2.1);

        db.update_bet_status(pending[0].id, BetStatus::Won, Some("2-1")).unwrap();
        let pending = db.list_pending_bets().unwrap();
        assert_eq!(pending.len(), 1);

        let stats = db.bet_stats().unwrap();
        assert_eq!((stats.total, stats.won, stats.lost), (2, 1, 0));
        assert_relative_eq!(stats.pct_won, 50.0);
    }

    #[test]
    fn empty_table_has_zero_pct() {
        let db = Database::open(":memory:").unwrap();
        let stats = db.bet_stats().unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.pct_won, 0.0);
    }

    #[test]
    fn team_stats_upsert_and_latest_season() {
        let db = Database::open(":memory:").unwrap();
        let s2023 = json!({"matches_played": 19, "wins": 10, "goals_for": 30, "goals": 1.6});
        let s2024 = json!({"matches_played": 12, "wins": 4, "goals_for": 11.0, "goals": [1, 0, 2]});
        db.upsert_team_stats("São Paulo", "2023", s2023.as_object().unwrap()).unwrap();
        db.upsert_team_stats("Sao Paulo", "2024", s2024.as_object().unwrap()).unwrap();

        let latest = db.get_team_stats("SAO PAULO", None).unwrap().unwrap();
        assert_eq!(latest.team, "sao paulo");
        assert_eq!(latest.season, "2024");
        assert_eq!(latest.goals_for, 11);
        assert_eq!(latest.raw.get("goals"), Some(&json!([1, 0, 2])));

        let older = db.get_team_stats("sao paulo", Some("2023")).unwrap().unwrap();
        assert_eq!(older.wins, 10);

        let replaced = json!({"matches_played": 20, "wins": 11});
        db.upsert_team_stats("sao paulo", "2023", replaced.as_object().unwrap()).unwrap();
        let older = db.get_team_stats("sao paulo", Some("2023")).unwrap().unwrap();
        assert_eq!((older.matches_played, older.wins, older.goals_for), (20, 11, 0));

        assert!(db.get_team_stats("santos", None).unwrap().is_none());
        assert!(db.upsert_team_stats("  ", "2024", &Map::new()).is_err());
    }

    #[tokio::test]
    async fn database_serves_summarized_stats() {
        let db = Database::open(":memory:").unwrap();
        let raw = json!({"goals": [1, 2, 3], "corners": "5.5"});
        db.upsert_team_stats("Ituano", "2024", raw.as_object().unwrap()).unwrap();

        let stats = db.fetch_team_stats("ituano").await.unwrap().unwrap();
        assert_relative_eq!(stats.number("goals").unwrap(), 2.0);
        assert_relative_eq!(stats.number("corners").unwrap(), 5.5);
        assert!(db.fetch_team_stats("guarani").await.unwrap().is_none());
    }
}
