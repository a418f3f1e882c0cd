use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

use crate::db::models::MatchRecord;

use super::provider::TeamResolver;
use super::SourceError;

const SOURCE_NAME: &str = "sofascore";

/// Home/away lookup through the Sofascore event API.
/// `GET {base}/api/v1/event/{id}` → `event.homeTeam.name`, `event.awayTeam.name`
pub struct SofascoreClient {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

impl SofascoreClient {
    pub fn new(base_url: Option<&str>) -> anyhow::Result<Self> {
        use anyhow::Context;
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("Mozilla/5.0 (compatible; parlay-scout/0.1)")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(SofascoreClient {
            http,
            base_url: base_url
                .unwrap_or("https://api.sofascore.com")
                .trim_end_matches('/')
                .to_string(),
        })
    }

    async fn fetch_event(&self, event_id: &str) -> Result<Value, SourceError> {
        let url = format!("{}/api/v1/event/{}", self.base_url, event_id);
        debug!("Fetching event {}", url);

        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(SourceError::Status {
                source_name: SOURCE_NAME.into(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json().await?)
    }
}

fn fragment_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"id:(\d+)").expect("valid regex"))
}

fn trailing_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)$").expect("valid regex"))
}

/// Event id from an `#id:NNN` fragment, else from the digits ending the
/// last path segment.
pub fn extract_event_id(page_url: &str) -> Option<String> {
    if let Some(c) = fragment_id_re().captures(page_url) {
        return Some(c[1].to_string());
    }
    let last = page_url.trim_end_matches('/').rsplit('/').next()?;
    trailing_digits_re()
        .captures(last)
        .map(|c| c[1].to_string())
}

/// Team names from an event payload, with or without the `event` wrapper.
pub fn parse_event_teams(payload: &Value) -> Option<(String, String)> {
    let event = payload.get("event").unwrap_or(payload);
    let name = |primary: &str, alternate: &str| {
        event
            .get(primary)
            .or_else(|| event.get(alternate))
            .and_then(|t| t.get("name"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };
    Some((name("homeTeam", "home")?, name("awayTeam", "away")?))
}

#[async_trait]
impl TeamResolver for SofascoreClient {
    async fn resolve_teams(&self, record: &MatchRecord) -> Result<Option<(String, String)>, SourceError> {
        let bare_id = record
            .id
            .as_deref()
            .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
            .map(ToString::to_string);
        let event_id = record.page_url().and_then(extract_event_id).or(bare_id);
        let Some(event_id) = event_id else {
            return Ok(None);
        };

        let payload = self.fetch_event(&event_id).await?;
        match parse_event_teams(&payload) {
            Some(pair) => Ok(Some(pair)),
            None => Err(SourceError::Payload {
                source_name: SOURCE_NAME.into(),
                reason: format!("event {} has no team names", event_id),
            }),
        }
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}
