//! Client for the radio station's now-playing feed.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::NowPlaying;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;

/// Source of now-playing readings for the sync engine.
#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    async fn fetch_now_playing(&self) -> Result<NowPlaying>;
}

/// Polls a fixed, unauthenticated JSON endpoint.
#[derive(Debug, Clone)]
pub struct StationClient {
    client: Client,
    url: String,
}

impl StationClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self::new(cfg.http_client()?, cfg.station_url.clone()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NowPlayingSource for StationClient {
    /// Network failures and non-2xx answers are errors; an undecodable body
    /// is not, it yields an empty reading.
    async fn fetch_now_playing(&self) -> Result<NowPlaying> {
        let resp = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned {}", self.url, status)));
        }
        let body = resp.text().await.map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(NowPlaying::from_feed_body(&body))
    }
}
