//! Access-token resolution.
//!
//! A token is taken from the configured env var when present. Otherwise the
//! authorized-user token file (the `token.json` written by Google's installed-app
//! consent flow) is read, and its access token is refreshed through the OAuth
//! token endpoint when it is missing or about to expire. Refreshed tokens are
//! written back to the same file.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use agendafetch_shared::{AgendaFetchError, AuthConfig, Result, expand_home};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Google's OAuth 2.0 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens closer than this to expiry are refreshed.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Authorized-user credentials as stored in `token.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Last issued access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// When `token` stops being valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    /// Fields we don't interpret (scopes, universe_domain, ...), preserved on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AuthorizedUser {
    /// Read a token file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AgendaFetchError::Auth(format!(
                    "token file {} not found. Provide an authorized-user token file \
                     or set an access token in the configured env var",
                    path.display()
                ))
            } else {
                AgendaFetchError::io(path, e)
            }
        })?;

        serde_json::from_str(&content).map_err(|e| {
            AgendaFetchError::Auth(format!("invalid token file {}: {e}", path.display()))
        })
    }

    /// Write the token file back (pretty JSON), readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AgendaFetchError::Auth(format!("failed to serialize token: {e}")))?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(|e| AgendaFetchError::io(path, e))?;
        // `mode` only applies on creation; tighten files that already existed.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| AgendaFetchError::io(path, e))?;
        }

        file.write_all(content.as_bytes())
            .map_err(|e| AgendaFetchError::io(path, e))
    }

    /// The stored access token, if it is still good at `now`.
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        let expiry = self.expiry?;
        (expiry - now > TimeDelta::seconds(EXPIRY_MARGIN_SECS)).then_some(token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Exchanges refresh tokens for access tokens.
pub struct TokenRefresher {
    client: Client,
    default_token_uri: String,
}

impl TokenRefresher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("AgendaFetch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AgendaFetchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            default_token_uri: DEFAULT_TOKEN_URI.to_string(),
        })
    }

    /// Use this endpoint when the token file does not name one.
    pub fn with_default_token_uri(mut self, uri: impl Into<String>) -> Self {
        self.default_token_uri = uri.into();
        self
    }

    /// Refresh `user`'s access token in place.
    pub async fn refresh(&self, user: &mut AuthorizedUser) -> Result<()> {
        let uri = user
            .token_uri
            .clone()
            .unwrap_or_else(|| self.default_token_uri.clone());

        debug!(%uri, "refreshing access token");

        let response = self
            .client
            .post(&uri)
            .form(&[
                ("client_id", user.client_id.as_str()),
                ("client_secret", user.client_secret.as_str()),
                ("refresh_token", user.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AgendaFetchError::Network(format!("{uri}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgendaFetchError::Network(format!("{uri}: failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(AgendaFetchError::Auth(format!(
                "token refresh rejected (HTTP {status}): {body}"
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AgendaFetchError::Auth(format!("unexpected token response: {e}")))?;

        user.token = Some(token.access_token);
        user.expiry = Some(Utc::now() + TimeDelta::seconds(token.expires_in));
        info!("access token refreshed");
        Ok(())
    }
}

/// Resolve an access token from the env var or the token file.
pub async fn access_token(auth: &AuthConfig) -> Result<String> {
    if let Ok(token) = std::env::var(&auth.access_token_env) {
        if !token.is_empty() {
            debug!(env = %auth.access_token_env, "using access token from environment");
            return Ok(token);
        }
    }

    let path = expand_home(&auth.token_file);
    token_from_file(&path, &TokenRefresher::new()?).await
}

/// Read `path`, refreshing and rewriting it if the stored token is stale.
pub async fn token_from_file(path: &Path, refresher: &TokenRefresher) -> Result<String> {
    let mut user = AuthorizedUser::load(path)?;

    if let Some(token) = user.valid_token(Utc::now()) {
        debug!(path = %path.display(), "stored access token still valid");
        return Ok(token.to_string());
    }

    refresher.refresh(&mut user).await?;
    user.save(path)?;

    user.token
        .ok_or_else(|| AgendaFetchError::Auth("token refresh returned no access token".into()))
}
