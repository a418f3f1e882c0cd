pub mod provider;
pub mod slug;
pub mod sofascore;

pub use provider::{NoStats, TeamResolver, TeamStatsSource};
pub use slug::{ChainResolver, RecordTeams, UrlSlugResolver};
pub use sofascore::SofascoreClient;

use thiserror::Error;

/// Failures of the collaborator sources. The evaluator never propagates
/// these; a failed lookup is treated as missing data.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} returned HTTP {status}")]
    Status { source_name: String, status: u16 },

    #[error("malformed payload from {source_name}: {reason}")]
    Payload { source_name: String, reason: String },

    #[error("stats database: {0:#}")]
    Database(#[source] anyhow::Error),
}
