use async_trait::async_trait;

use crate::db::models::MatchRecord;
use crate::engine::stats::TeamStats;

use super::SourceError;

/// Trait that every home/away resolver must implement.
#[async_trait]
pub trait TeamResolver: Send + Sync {
    /// Home and away display names, or `None` when this resolver cannot tell.
    async fn resolve_teams(&self, record: &MatchRecord) -> Result<Option<(String, String)>, SourceError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// On-demand statistics for teams missing from the run cache.
#[async_trait]
pub trait TeamStatsSource: Send + Sync {
    /// Summarized statistics for a normalized team name.
    async fn fetch_team_stats(&self, team: &str) -> Result<Option<TeamStats>, SourceError>;

    fn name(&self) -> &str;
}

/// Stats source that never has anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStats;

#[async_trait]
impl TeamStatsSource for NoStats {
    async fn fetch_team_stats(&self, _team: &str) -> Result<Option<TeamStats>, SourceError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "none"
    }
}
