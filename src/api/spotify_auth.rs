use super::auth::{basic_auth, AccessToken, OAuthToken, TokenResponse};
use super::pkce;
use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::header::AUTHORIZATION;
use tracing::info;
use url::Url;

/// Scopes needed to read the user's playlists and append to the managed one.
pub const SCOPES: &[&str] = &[
    "playlist-modify-public",
    "playlist-modify-private",
    "playlist-read-private",
    "playlist-read-collaborative",
];

/// A pending authorization: the URL the user must open plus what is needed to
/// validate and exchange the redirect that comes back.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub url: Url,
    pub state: String,
    pub code_verifier: Option<String>,
}

/// Build the Spotify authorization URL. Clients without a secret use PKCE.
pub fn build_auth_request(cfg: &Config) -> Result<AuthRequest> {
    if cfg.client_id.is_empty() {
        return Err(Error::auth("no client_id configured (set client_id or CLIENTID)"));
    }
    let state = uuid::Uuid::new_v4().simple().to_string();
    let code_verifier = if cfg.client_secret.is_empty() {
        Some(pkce::generate_code_verifier())
    } else {
        None
    };

    let mut url = Url::parse(&format!("{}/authorize", cfg.auth_base.trim_end_matches('/')))
        .map_err(|e| Error::Config(format!("auth_base: {}", e)))?;
    {
        let mut q = url.query_pairs_mut();
        q.append_pair("response_type", "code")
            .append_pair("client_id", &cfg.client_id)
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("redirect_uri", &cfg.redirect_uri)
            .append_pair("state", &state);
        if let Some(v) = &code_verifier {
            q.append_pair("code_challenge_method", "S256")
                .append_pair("code_challenge", &pkce::code_challenge_s256(v));
        }
    }
    Ok(AuthRequest { url, state, code_verifier })
}

/// Pull the authorization code out of the redirect URL, checking `state`.
pub fn code_from_redirect(redirect: &str, expected_state: &str) -> Result<String> {
    let parsed = Url::parse(redirect.trim()).map_err(|e| Error::auth(format!("invalid url pasted: {}", e)))?;
    let param = |name: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };
    if let Some(err) = param("error") {
        return Err(Error::auth(format!("authorization denied: {}", err)));
    }
    if param("state").as_deref() != Some(expected_state) {
        return Err(Error::auth("invalid state"));
    }
    param("code").ok_or_else(|| Error::auth("no code in redirect URL"))
}

/// Exchange an authorization code for an access token.
pub async fn exchange_code(
    client: &reqwest::Client,
    cfg: &Config,
    code: &str,
    code_verifier: Option<&str>,
) -> Result<AccessToken> {
    let url = format!("{}/api/token", cfg.auth_base.trim_end_matches('/'));
    let mut params = vec![
        ("grant_type", "authorization_code".to_string()),
        ("code", code.to_string()),
        ("redirect_uri", cfg.redirect_uri.clone()),
    ];
    let mut req = client.post(&url);
    match code_verifier {
        Some(v) => {
            params.push(("client_id", cfg.client_id.clone()));
            params.push(("code_verifier", v.to_string()));
        }
        None => {
            req = req.header(AUTHORIZATION, basic_auth(&cfg.client_id, &cfg.client_secret));
        }
    }
    let resp = req.form(&params).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(Error::auth(format!("code exchange failed: {} => {}", status, txt)));
    }
    let tr: TokenResponse = resp
        .json()
        .await
        .map_err(|e| Error::Parse(format!("token response: {}", e)))?;
    Ok(tr.into_access_token(None))
}

/// Manual authorization-code flow:
/// 1. Print the authorization URL.
/// 2. The user approves in a browser and is redirected to `redirect_uri`.
/// 3. The user pastes the full redirect URL back here.
/// 4. The code is exchanged and a refreshing token source is returned.
///
/// The token is kept in memory only.
pub async fn authorize_interactive(cfg: &Config) -> Result<OAuthToken> {
    let request = build_auth_request(cfg)?;
    println!(
        "Open this URL in your browser and authorize the application:\n\n{}\n",
        request.url
    );
    println!("After authorizing, you'll be redirected to {}. Copy the full redirect URL and paste it here.", cfg.redirect_uri);
    println!("Paste redirect URL:");

    // stdin is blocking; the startup path simply awaits the reader task
    let pasted = tokio::task::spawn_blocking(|| -> std::io::Result<String> {
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        Ok(input)
    })
    .await
    .map_err(|e| Error::auth(format!("reading redirect URL: {}", e)))?
    .map_err(|e| Error::auth(format!("reading redirect URL: {}", e)))?;

    let code = code_from_redirect(&pasted, &request.state)?;
    let client = cfg.http_client()?;
    let token = exchange_code(&client, cfg, &code, request.code_verifier.as_deref()).await?;
    info!("Spotify authorization complete; token expires at {}", token.expires_at);
    Ok(OAuthToken::new(
        client,
        cfg.auth_base.clone(),
        cfg.client_id.clone(),
        cfg.client_secret.clone(),
        token,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(secret: &str) -> Config {
        let mut c = Config::default();
        c.client_id = "cid".into();
        c.client_secret = secret.into();
        c
    }

    #[test]
    fn auth_url_with_secret_has_no_pkce() {
        let req = build_auth_request(&cfg("shh")).unwrap();
        assert!(req.code_verifier.is_none());
        let pairs: Vec<(String, String)> = req.url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "cid".into())));
        assert!(pairs.contains(&("state".into(), req.state.clone())));
        assert!(pairs.iter().all(|(k, _)| k != "code_challenge"));
        assert!(req.url.as_str().starts_with("https://accounts.spotify.com/authorize?"));
    }

    #[test]
    fn auth_url_without_secret_uses_pkce() {
        let req = build_auth_request(&cfg("")).unwrap();
        let verifier = req.code_verifier.clone().unwrap();
        let pairs: Vec<(String, String)> = req.url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("code_challenge".into(), pkce::code_challenge_s256(&verifier))));
        assert!(pairs.contains(&("code_challenge_method".into(), "S256".into())));
    }

    #[test]
    fn missing_client_id_is_rejected() {
        let mut c = cfg("x");
        c.client_id.clear();
        assert!(matches!(build_auth_request(&c), Err(Error::Auth(_))));
    }

    #[test]
    fn redirect_state_is_checked() {
        let ok = code_from_redirect("http://localhost:3000/callback?code=abc&state=s1", "s1").unwrap();
        assert_eq!(ok, "abc");
        assert!(code_from_redirect("http://localhost:3000/callback?code=abc&state=other", "s1").is_err());
        assert!(code_from_redirect("http://localhost:3000/callback?error=access_denied&state=s1", "s1").is_err());
        assert!(code_from_redirect("not a url", "s1").is_err());
    }
}
