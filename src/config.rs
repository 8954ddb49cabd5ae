use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Station now-playing endpoint (unauthenticated JSON feed).
    #[serde(default = "default_station_url")]
    pub station_url: String,

    // Spotify endpoints; overridable so tests can point at a local mock server.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_auth_base")]
    pub auth_base: String,

    // OAuth client
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Pre-issued bearer token. When set, the interactive authorization is skipped.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Applies to every outbound HTTP request.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Directory for the daily-rotated log file. Stdout only when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_station_url() -> String { "https://player.rogersradio.ca/chdi/widget/now_playing".into() }
fn default_api_base() -> String { "https://api.spotify.com/v1".into() }
fn default_auth_base() -> String { "https://accounts.spotify.com".into() }
fn default_redirect_uri() -> String { "http://localhost:3000/callback".into() }
fn default_http_timeout() -> u64 { 10 }

impl Default for Config {
    fn default() -> Self {
        Self {
            station_url: default_station_url(),
            api_base: default_api_base(),
            auth_base: default_auth_base(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            access_token: None,
            http_timeout_secs: default_http_timeout(),
            log_dir: None,
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Load from an explicit path, else the per-user config file if present,
    /// else built-in defaults. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::from_path(p)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(p) => Self::from_path(&p)?,
                None => Self::default(),
            },
        };
        cfg.apply_env_overrides(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("station-playlist-sync").join("config.toml"))
    }

    /// Overlay CLIENTID, CLIENTSECRET and SPOTIFY_ACCESS_TOKEN from the environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CLIENTID").filter(|v| !v.is_empty()) {
            self.client_id = v;
        }
        if let Some(v) = lookup("CLIENTSECRET").filter(|v| !v.is_empty()) {
            self.client_secret = v;
        }
        if let Some(v) = lookup("SPOTIFY_ACCESS_TOKEN").filter(|v| !v.is_empty()) {
            self.access_token = Some(v);
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;
        for (key, value) in [
            ("station_url", &self.station_url),
            ("api_base", &self.api_base),
            ("auth_base", &self.auth_base),
            ("redirect_uri", &self.redirect_uri),
        ] {
            url::Url::parse(value).map_err(|e| Error::Config(format!("{} {:?}: {}", key, value, e)))?;
        }
        if self.http_timeout_secs == 0 {
            return Err(Error::Config("http_timeout_secs must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Shared HTTP client; every request inherits the configured timeout.
    pub fn http_client(&self) -> crate::error::Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .timeout(self.http_timeout())
            .user_agent(concat!("station-playlist-sync/", env!("CARGO_PKG_VERSION")))
            .build()?)
    }
}
