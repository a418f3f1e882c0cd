use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::db::models::MatchRecord;

use super::provider::TeamResolver;
use super::SourceError;

/// Scraped pages sometimes fill the team slots with the "compare teams"
/// button label instead of a name.
fn is_placeholder(name: &str) -> bool {
    let n = name.trim().to_lowercase();
    n.is_empty() || n.contains("comparar") || n == "?"
}

/// Uses the names already present on the match record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordTeams;

#[async_trait]
impl TeamResolver for RecordTeams {
    async fn resolve_teams(&self, record: &MatchRecord) -> Result<Option<(String, String)>, SourceError> {
        let (Some(home), Some(away)) = (record.home.as_deref(), record.away.as_deref()) else {
            return Ok(None);
        };
        if is_placeholder(home) || is_placeholder(away) {
            return Ok(None);
        }
        Ok(Some((home.trim().to_string(), away.trim().to_string())))
    }

    fn name(&self) -> &str {
        "record"
    }
}

/// Infers the teams from a `/match/<home>-<away>/...` page URL.
///
/// The slug carries no separator between the two names, so the tokens are
/// split at the midpoint: `sao-paulo-santos` becomes "Sao" / "Paulo Santos".
/// Good enough for pages that offer nothing better.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlSlugResolver;

impl UrlSlugResolver {
    pub fn teams_from_url(page_url: &str) -> Option<(String, String)> {
        let url = Url::parse(page_url).ok()?;
        let mut segments = url.path_segments()?;
        segments.find(|s| *s == "match")?;
        let slug = segments.next()?.to_lowercase();

        let parts: Vec<&str> = slug.split('-').filter(|p| !p.is_empty()).collect();
        if parts.len() < 2 {
            return None;
        }
        let split = (parts.len() / 2).max(1);
        Some((title_case(&parts[..split]), title_case(&parts[split..])))
    }
}

fn title_case(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl TeamResolver for UrlSlugResolver {
    async fn resolve_teams(&self, record: &MatchRecord) -> Result<Option<(String, String)>, SourceError> {
        let found = [record.source_url.as_deref(), record.match_url.as_deref()]
            .into_iter()
            .flatten()
            .find_map(Self::teams_from_url);
        Ok(found)
    }

    fn name(&self) -> &str {
        "url-slug"
    }
}

/// Tries each resolver in turn; the first pair wins. A failing resolver is
/// logged and skipped.
pub struct ChainResolver {
    resolvers: Vec<Arc<dyn TeamResolver>>,
}

impl ChainResolver {
    pub fn new(resolvers: Vec<Arc<dyn TeamResolver>>) -> Self {
        ChainResolver { resolvers }
    }
}

#[async_trait]
impl TeamResolver for ChainResolver {
    async fn resolve_teams(&self, record: &MatchRecord) -> Result<Option<(String, String)>, SourceError> {
        for resolver in &self.resolvers {
            match resolver.resolve_teams(record).await {
                Ok(Some(pair)) => {
                    debug!("{} resolved {} via {}", record.match_id(), pair.0, resolver.name());
                    return Ok(Some(pair));
                }
                Ok(None) => {}
                Err(e) => warn!("{} resolver failed for {}: {}", resolver.name(), record.match_id(), e),
            }
        }
        Ok(None)
    }

    fn name(&self) -> &str {
        "chain"
    }
}
