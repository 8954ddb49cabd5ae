use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seconds before expiry at which a token is refreshed proactively.
const REFRESH_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

impl AccessToken {
    pub fn is_near_expiry(&self, now: i64) -> bool {
        now + REFRESH_MARGIN_SECS >= self.expires_at
    }
}

/// Token endpoint response for both code exchange and refresh.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_access_token(self, previous_refresh: Option<String>) -> AccessToken {
        AccessToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
            expires_at: Utc::now().timestamp() + self.expires_in.unwrap_or(3600),
            // refresh responses may omit the refresh token; keep the old one then
            refresh_token: self.refresh_token.or(previous_refresh),
            scope: self.scope,
        }
    }
}

/// Supplies the bearer credential for streaming-service calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Full `Authorization` header value, e.g. "Bearer abc".
    async fn bearer(&self) -> Result<String>;

    /// Force a refresh after the service rejected the current token.
    async fn refresh(&self) -> Result<()>;
}

/// A fixed, pre-issued access token. It cannot be refreshed.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.token))
    }

    async fn refresh(&self) -> Result<()> {
        Err(Error::auth("static access token was rejected and cannot be refreshed"))
    }
}

/// Access token obtained through the authorization-code flow, refreshed in
/// memory with its refresh token when it nears expiry.
pub struct OAuthToken {
    client: Client,
    auth_base: String,
    client_id: String,
    client_secret: String,
    token: tokio::sync::Mutex<AccessToken>,
}

impl OAuthToken {
    pub fn new(
        client: Client,
        auth_base: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token: AccessToken,
    ) -> Self {
        Self {
            client,
            auth_base: auth_base.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: tokio::sync::Mutex::new(token),
        }
    }

    /// Snapshot of the token currently held.
    pub async fn current(&self) -> AccessToken {
        self.token.lock().await.clone()
    }

    async fn refresh_locked(&self, cur: &mut AccessToken) -> Result<()> {
        let refresh_token = cur
            .refresh_token
            .clone()
            .ok_or_else(|| Error::auth("no refresh token"))?;
        let url = format!("{}/api/token", self.auth_base.trim_end_matches('/'));
        let mut params = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", refresh_token.clone()),
        ];
        let mut req = self.client.post(&url);
        if self.client_secret.is_empty() {
            // PKCE clients identify themselves in the form body instead
            params.push(("client_id", self.client_id.clone()));
        } else {
            req = req.header(AUTHORIZATION, basic_auth(&self.client_id, &self.client_secret));
        }
        let resp = req.form(&params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::auth(format!("failed to refresh token: {} - {}", status, body)));
        }
        let tr: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::Parse(format!("token response: {}", e)))?;
        *cur = tr.into_access_token(Some(refresh_token));
        debug!("Spotify access token refreshed; expires at {}", cur.expires_at);
        Ok(())
    }
}

#[async_trait]
impl TokenSource for OAuthToken {
    async fn bearer(&self) -> Result<String> {
        let mut lock = self.token.lock().await;
        if lock.is_near_expiry(Utc::now().timestamp()) {
            debug!("Spotify token is near expiry, refreshing");
            self.refresh_locked(&mut lock).await?;
        }
        Ok(format!("Bearer {}", lock.access_token))
    }

    async fn refresh(&self) -> Result<()> {
        let mut lock = self.token.lock().await;
        self.refresh_locked(&mut lock).await
    }
}

pub(crate) fn basic_auth(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", client_id, client_secret))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_formats_bearer_and_refuses_refresh() {
        let t = StaticToken::new("abc");
        assert_eq!(t.bearer().await.unwrap(), "Bearer abc");
        assert!(matches!(t.refresh().await, Err(Error::Auth(_))));
    }

    #[test]
    fn basic_auth_header() {
        assert_eq!(basic_auth("test_id", "test_secret"), "Basic dGVzdF9pZDp0ZXN0X3NlY3JldA==");
    }

    #[test]
    fn refresh_response_keeps_previous_refresh_token() {
        let tr = TokenResponse {
            access_token: "new".into(),
            token_type: None,
            expires_in: Some(60),
            refresh_token: None,
            scope: None,
        };
        let t = tr.into_access_token(Some("r1".into()));
        assert_eq!(t.refresh_token.as_deref(), Some("r1"));
        assert_eq!(t.token_type, "Bearer");
        assert!(!t.is_near_expiry(Utc::now().timestamp()));
    }

    #[tokio::test]
    async fn token_without_refresh_token_fails_when_expired() {
        let tok = OAuthToken::new(
            Client::new(),
            "http://127.0.0.1:9",
            "cid",
            "",
            AccessToken {
                access_token: "old".into(),
                token_type: "Bearer".into(),
                expires_at: 0,
                refresh_token: None,
                scope: None,
            },
        );
        assert!(matches!(tok.bearer().await, Err(Error::Auth(_))));
    }
}
