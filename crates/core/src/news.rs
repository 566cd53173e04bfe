//! Steam news feed client and normalization.
//!
//! One HTTP GET per tracked game against `ISteamNews/GetNewsForApp`. The
//! client validates the response shape explicitly and filters out
//! everything that is not an official announcement (`feed_type == 1`).
//! Deduplication is the poller's job; this module is a pure
//! I/O-plus-normalization boundary.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::SteamConfig;

/// Upstream classification tag for official announcements. Everything
/// else (community posts, syndicated articles) is discarded.
const OFFICIAL_ANNOUNCEMENT_FEED_TYPE: i64 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewsItem {
    pub gid: String,
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOutcome {
    pub app_id: String,
    pub display_name: String,
    pub items: Vec<NewsItem>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("news request failed: {0}")]
    Transport(String),
    #[error("unexpected API response format")]
    MalformedResponse,
}

#[async_trait]
pub trait NewsFeed: Send + Sync {
    /// Fetches the most recent feed page for one game. Must not panic
    /// and must not abort on malformed payloads; one game's failure is
    /// isolated to that game's cycle slot.
    async fn fetch(&self, app_id: &str, display_name: &str) -> Result<FetchOutcome, FetchError>;
}

#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    pub appnews: Option<AppNews>,
}

#[derive(Debug, Deserialize)]
pub struct AppNews {
    #[serde(default)]
    pub appname: Option<String>,
    pub newsitems: Option<Vec<RawNewsItem>>,
}

#[derive(Debug, Deserialize)]
pub struct RawNewsItem {
    pub gid: String,
    pub url: String,
    #[serde(default)]
    pub feed_type: i64,
}

/// Validates the wire shape and keeps only official announcements,
/// preserving the feed's newest-first order.
pub fn normalize_response(
    app_id: &str,
    display_name: &str,
    response: NewsResponse,
) -> Result<FetchOutcome, FetchError> {
    let appnews = response.appnews.ok_or(FetchError::MalformedResponse)?;
    let newsitems = appnews.newsitems.ok_or(FetchError::MalformedResponse)?;

    let display_name = appnews
        .appname
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| display_name.to_owned());

    let items: Vec<NewsItem> = newsitems
        .into_iter()
        .filter(|item| item.feed_type == OFFICIAL_ANNOUNCEMENT_FEED_TYPE)
        .map(|item| NewsItem { gid: item.gid, url: item.url })
        .collect();

    debug!(app_id, game = %display_name, kept = items.len(), "normalized news response");

    Ok(FetchOutcome { app_id: app_id.to_owned(), display_name, items })
}

pub struct SteamNewsClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    page_size: u8,
}

impl SteamNewsClient {
    pub fn new(config: &SteamConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            page_size: config.page_size,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/ISteamNews/GetNewsForApp/v2/", self.base_url)
    }
}

#[async_trait]
impl NewsFeed for SteamNewsClient {
    async fn fetch(&self, app_id: &str, display_name: &str) -> Result<FetchOutcome, FetchError> {
        // Never log the key itself.
        info!(
            app_id,
            game = display_name,
            endpoint = %self.endpoint(),
            "fetching news (key=REDACTED)"
        );

        let count = self.page_size.to_string();
        let response = self
            .http
            .get(self.endpoint())
            .query(&[
                ("key", self.api_key.expose_secret()),
                ("appid", app_id),
                ("count", count.as_str()),
            ])
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let body: NewsResponse =
            response.json().await.map_err(|_| FetchError::MalformedResponse)?;

        normalize_response(app_id, display_name, body)
    }
}
