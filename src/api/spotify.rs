use super::auth::TokenSource;
use super::StreamingService;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{track_uri, PlaylistHandle, PlaylistPage, PlaylistSummary, TrackPage};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Deserialize)]
struct PlaylistsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
    #[serde(default)]
    total: Option<u32>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    owner: Option<OwnerRef>,
}

#[derive(Deserialize)]
struct OwnerRef {
    #[serde(default)]
    id: String,
}

#[derive(Deserialize)]
struct CreatedPlaylist {
    id: String,
    #[serde(default)]
    owner: Option<OwnerRef>,
}

#[derive(Deserialize)]
struct TracksResponse {
    #[serde(default)]
    items: Vec<TrackItem>,
    #[serde(default)]
    total: u32,
}

#[derive(Deserialize)]
struct TrackItem {
    // null for removed tracks
    #[serde(default)]
    track: Option<TrackRef>,
}

#[derive(Deserialize)]
struct TrackRef {
    // null for local files
    #[serde(default)]
    id: Option<String>,
}

/// Spotify Web API client.
/// Every request carries the bearer from the token source; a 401 triggers one
/// token refresh and one replay of the request.
pub struct SpotifyClient {
    client: Client,
    api_base: String,
    tokens: Arc<dyn TokenSource>,
}

impl SpotifyClient {
    pub fn new(client: Client, api_base: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn from_config(cfg: &Config, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        Ok(Self::new(cfg.http_client()?, cfg.api_base.clone(), tokens))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Send an authorized request built by `build`, refreshing the token once on 401.
    /// Non-2xx responses become `Error::Api`.
    async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let bearer = self.tokens.bearer().await?;
        let resp = build(&self.client).header(AUTHORIZATION, &bearer).send().await?;
        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            warn!("Spotify rejected the access token; attempting token refresh");
            self.tokens.refresh().await?;
            let bearer = self.tokens.bearer().await?;
            build(&self.client).header(AUTHORIZATION, &bearer).send().await?
        } else {
            resp
        };
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::api(status, body));
        }
        Ok(resp)
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
        resp.json::<T>()
            .await
            .map_err(|e| Error::Parse(format!("{}: {}", what, e)))
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[async_trait]
impl StreamingService for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn current_user_id(&self) -> Result<String> {
        let url = self.url("/me");
        let resp = self.execute(|c| c.get(&url)).await?;
        let user: UserResponse = Self::decode(resp, "current user").await?;
        if user.id.is_empty() {
            return Err(Error::Parse("current user: empty id".into()));
        }
        Ok(user.id)
    }

    async fn list_playlists(&self, offset: u32, limit: u32) -> Result<PlaylistPage> {
        let url = self.url("/me/playlists");
        let query = [("limit", limit), ("offset", offset)];
        let resp = self.execute(|c| c.get(&url).query(&query)).await?;
        let page: PlaylistsResponse = Self::decode(resp, "playlist listing").await?;
        debug!("listed {} playlists at offset {}", page.items.len(), offset);
        Ok(PlaylistPage {
            items: page
                .items
                .into_iter()
                .map(|p| PlaylistSummary {
                    id: p.id,
                    name: p.name,
                    owner_id: p.owner.map(|o| o.id).unwrap_or_default(),
                })
                .collect(),
            limit: page.limit.unwrap_or(limit),
            offset: page.offset.unwrap_or(offset),
            total: page.total,
        })
    }

    async fn create_playlist(&self, user_id: &str, name: &str, description: &str) -> Result<PlaylistHandle> {
        let url = self.url(&format!("/users/{}/playlists", encode(user_id)));
        let body = json!({
            "name": name,
            "description": description,
        });
        let resp = self
            .execute(|c| c.post(&url).header(CONTENT_TYPE, "application/json").json(&body))
            .await?;
        let created: CreatedPlaylist = Self::decode(resp, "created playlist").await?;
        Ok(PlaylistHandle {
            id: created.id,
            owner_id: created
                .owner
                .map(|o| o.id)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| user_id.to_string()),
        })
    }

    async fn list_playlist_tracks(&self, playlist_id: &str, offset: u32, limit: u32) -> Result<TrackPage> {
        let url = self.url(&format!("/playlists/{}/tracks", encode(playlist_id)));
        let limit_s = limit.to_string();
        let offset_s = offset.to_string();
        let query = [
            ("fields", "items(track(id)),total"),
            ("limit", limit_s.as_str()),
            ("offset", offset_s.as_str()),
        ];
        let resp = self.execute(|c| c.get(&url).query(&query)).await?;
        let page: TracksResponse = Self::decode(resp, "playlist tracks").await?;
        let returned = page.items.len() as u32;
        Ok(TrackPage {
            returned,
            ids: page
                .items
                .into_iter()
                .filter_map(|it| it.track.and_then(|t| t.id))
                .filter(|id| !id.is_empty())
                .collect(),
            total: page.total,
        })
    }

    async fn append_track(&self, playlist_id: &str, track_id: &str) -> Result<()> {
        let url = self.url(&format!("/playlists/{}/tracks", encode(playlist_id)));
        let body = json!({ "uris": [track_uri(track_id)] });
        self.execute(|c| c.post(&url).header(CONTENT_TYPE, "application/json").json(&body))
            .await?;
        Ok(())
    }
}
