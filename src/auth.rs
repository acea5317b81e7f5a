//! OAuth2 client-credentials authentication for the Azure AD Graph API.
//!
//! Acquires bearer tokens from the tenant's v1 `/oauth2/token` endpoint using
//! the client_credentials grant. The token is cached in `TokenProvider` and
//! refreshed lazily: `token()` returns `None` once the cached token is close
//! to expiry, and `GraphClient` refreshes on the next request.

use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{GraphError, Result};

/// Form body sent to the token endpoint.
/// Serialized as `application/x-www-form-urlencoded` by reqwest's `.form()`.
#[derive(Serialize)]
pub struct TokenRequest<'a> {
    client_id: &'a str,
    scope: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
}

/// Subset of the token response that we need.
///
/// The v1 endpoint reports `expires_in` as a JSON string while v2 uses a
/// number, so both are accepted.
#[derive(Deserialize)]
pub struct TokenResponse {
    /// Bearer token sent on API requests.
    pub access_token: String,
    /// Usually `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds from issue.
    #[serde(deserialize_with = "seconds_from_str_or_int")]
    pub expires_in: u64,
}

fn seconds_from_str_or_int<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Int(u64),
        Str(String),
    }

    match Seconds::deserialize(d)? {
        Seconds::Int(n) => Ok(n),
        Seconds::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Refresh this long before the token actually expires so requests do not
/// race the expiry boundary.
const EXPIRY_BUFFER_SECS: u64 = 60;

/// Token requests are small; bound them tighter than API calls.
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages OAuth2 token acquisition and caching.
///
/// Invariants:
/// - `response` is `None` until the first successful `refresh_token()` call.
/// - `acquired_at` is always `Some` when `response` is `Some`.
pub struct TokenProvider {
    client: reqwest::Client,
    token_url: String,
    scope: String,
    client_id: String,
    client_secret: SecretString,
    response: Option<TokenResponse>,
    acquired_at: Option<Instant>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("token_url", &self.token_url)
            .field("scope", &self.scope)
            .field("client_id", &self.client_id)
            .field("has_token", &self.response.is_some())
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    /// `token_url` is the fully interpolated token endpoint, see
    /// [`GraphConfig::token_url`](crate::config::GraphConfig::token_url).
    pub fn new(token_url: &str, client_id: &str, client_secret: SecretString, scope: &str) -> Self {
        TokenProvider {
            client: build_token_client(),
            token_url: token_url.to_string(),
            scope: scope.to_string(),
            client_id: client_id.to_string(),
            client_secret,
            response: None,
            acquired_at: None,
        }
    }

    /// Creates a `TokenProvider` with a pre-set token, bypassing Azure AD.
    /// The token is treated as freshly acquired (expires_in = 3600s).
    pub fn with_token(token: &str) -> Self {
        TokenProvider {
            client: build_token_client(),
            token_url: String::new(),
            scope: String::new(),
            client_id: String::new(),
            client_secret: SecretString::from(String::new()),
            response: Some(TokenResponse {
                access_token: token.to_string(),
                token_type: Some("Bearer".to_string()),
                expires_in: 3600,
            }),
            acquired_at: Some(Instant::now()),
        }
    }

    /// Fetches a new token and caches it.
    ///
    /// The body is read as text before the status check so the AADSTS
    /// diagnostic survives into the error.
    pub async fn refresh_token(&mut self) -> Result<()> {
        let body = TokenRequest {
            client_id: &self.client_id,
            scope: &self.scope,
            client_secret: self.client_secret.expose_secret(),
            grant_type: "client_credentials",
        };

        debug!(token_url = %self.token_url, client_id = %self.client_id, "requesting access token");

        let response = self
            .client
            .post(&self.token_url)
            .form(&body)
            .send()
            .await
            .map_err(|e| auth_error("token request failed", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| auth_error("could not read token response", e))?;

        if !status.is_success() {
            return Err(GraphError::Auth {
                message: format!("token request failed ({status}): {body}"),
                source: None,
            });
        }

        let resp: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| auth_error("failed to parse token response", e))?;
        debug!(expires_in = resp.expires_in, "access token acquired");
        self.acquired_at = Some(Instant::now());
        self.response = Some(resp);

        Ok(())
    }

    /// Drops the cached token so the next request fetches a new one.
    pub fn invalidate(&mut self) {
        self.response = None;
        self.acquired_at = None;
    }

    fn is_expired(&self) -> bool {
        match (&self.response, self.acquired_at) {
            (Some(resp), Some(acquired)) => {
                let lifetime = resp.expires_in.saturating_sub(EXPIRY_BUFFER_SECS);
                acquired.elapsed().as_secs() >= lifetime
            }
            _ => false,
        }
    }

    /// Returns the cached access token, or `None` if no token exists or it is
    /// within the expiry buffer.
    pub fn token(&self) -> Option<&str> {
        if self.is_expired() {
            return None;
        }
        self.response.as_ref().map(|ret| ret.access_token.as_str())
    }
}

fn build_token_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(TOKEN_REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

fn auth_error(message: &str, source: impl std::error::Error + Send + Sync + 'static) -> GraphError {
    GraphError::Auth {
        message: message.to_string(),
        source: Some(Box::new(source)),
    }
}
