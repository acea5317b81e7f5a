//! Authenticated HTTP client for the Azure AD Graph API.
//!
//! `GraphClient` owns a `reqwest::Client`, the parsed API base URL and a
//! `TokenProvider` behind a `Mutex`. Requests are built with
//! [`GraphClient::new_request`] and sent with [`GraphClient::execute`], which
//! attaches the bearer token and turns error statuses into [`GraphError`]s.
//!
//! Token lifecycle:
//! - Lazy acquisition: the first request that finds no cached token triggers
//!   `refresh_token()`.
//! - Expiry-aware: an expired token is refreshed on the next request.
//! - No retries: a rejected request is reported to the caller as-is.

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::auth::TokenProvider;
use crate::config::GraphConfig;
use crate::context::CallContext;
use crate::error::{ApiError, GraphError, ODataEnvelope, Result};

/// Authenticated client for the Graph API, scoped to one tenant.
///
/// - `auth` is behind a `Mutex` because `refresh_token()` requires
///   `&mut self`. The lock is held only for the token check/refresh, never
///   across an API round-trip.
/// - Everything else is read-only after construction, so one client can be
///   shared across tasks.
#[derive(Debug)]
pub struct GraphClient {
    tenant_id: String,
    client: Client,
    base_url: Url,
    config: GraphConfig,
    auth: Mutex<TokenProvider>,
}

impl GraphClient {
    /// Client for the public Graph endpoint, authenticating with the
    /// client-credentials grant against `tenant_id`.
    pub fn new(tenant_id: &str, client_id: &str, client_secret: SecretString) -> Result<Self> {
        GraphClient::with_credentials(GraphConfig::default(), tenant_id, client_id, client_secret)
    }

    /// Client-credentials client against the endpoints in `config`.
    pub fn with_credentials(
        config: GraphConfig,
        tenant_id: &str,
        client_id: &str,
        client_secret: SecretString,
    ) -> Result<Self> {
        let auth = TokenProvider::new(
            &config.token_url(tenant_id),
            client_id,
            client_secret,
            &config.default_scope,
        );
        GraphClient::with_config(config, tenant_id, auth)
    }

    /// Client with explicit endpoints and token provider. Used by tests to
    /// point at a mock server.
    pub fn with_config(config: GraphConfig, tenant_id: &str, auth: TokenProvider) -> Result<Self> {
        let base_url = parse_base_url(&config.api_base_url)?;

        let mut builder = Client::builder().connect_timeout(config.connect_timeout);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(GraphClient {
            tenant_id: tenant_id.to_string(),
            client: builder.build()?,
            base_url,
            config,
            auth: Mutex::new(auth),
        })
    }

    /// Tenant every endpoint is scoped to.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Parsed API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Configuration the client was built with.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Builds `{base}/{tenant}/{segments...}?api-version={version}`.
    ///
    /// Each segment is percent-encoded; an empty final segment yields a
    /// trailing slash.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GraphError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push(&self.tenant_id)
            .extend(segments);
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    /// Creates an API request.
    ///
    /// `url` is resolved against the base URL, so relative paths land under
    /// it and absolute URLs replace it. When `body` is present it is JSON
    /// encoded (serde_json never HTML-escapes) and `Content-Type` is set.
    pub fn new_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Request> {
        let url = self.base_url.join(url)?;
        let mut request = reqwest::Request::new(method, url);

        if let Some(payload) = body {
            let encoded = serde_json::to_vec(payload)?;
            request
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            *request.body_mut() = Some(encoded.into());
        }

        Ok(request)
    }

    /// Returns a valid bearer token, refreshing if none is cached or the
    /// current one has expired.
    async fn bearer_token(&self) -> Result<String> {
        let mut auth = self.auth.lock().await;
        if auth.token().is_none() {
            auth.refresh_token().await?;
        }

        auth.token().map(str::to_owned).ok_or_else(|| GraphError::Auth {
            message: "token missing after refresh".to_string(),
            source: None,
        })
    }

    /// Sends an API request and returns the unread response.
    ///
    /// The token fetch and the request are both bounded by `ctx`. When the
    /// transport fails after `ctx` has concluded, the context's error is
    /// returned instead of the transport symptom. Error statuses are decoded
    /// by [`check_response`].
    pub async fn execute(&self, ctx: &CallContext, mut request: reqwest::Request) -> Result<reqwest::Response> {
        let token = ctx.run(self.bearer_token()).await?;
        request.headers_mut().insert(AUTHORIZATION, bearer_header(&token)?);

        let method = request.method().clone();
        debug!(%method, url = %request.url(), "sending graph request");

        let sent = ctx
            .run(async { self.client.execute(request).await.map_err(GraphError::from) })
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(GraphError::Network(err)) => return Err(ctx.resolve_transport_error(err)),
            Err(err) => return Err(err),
        };

        debug!(%method, status = response.status().as_u16(), "graph response received");
        check_response(&method, response).await
    }

    /// Sends `request` and decodes the JSON success body into `T`.
    pub(crate) async fn execute_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: reqwest::Request,
    ) -> Result<T> {
        let body = self.execute_bytes(ctx, request).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Sends `request` and returns the success body as text.
    pub(crate) async fn execute_text(&self, ctx: &CallContext, request: reqwest::Request) -> Result<String> {
        let body = self.execute_bytes(ctx, request).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn execute_bytes(&self, ctx: &CallContext, request: reqwest::Request) -> Result<Bytes> {
        let response = self.execute(ctx, request).await?;
        ctx.run(async { response.bytes().await.map_err(GraphError::from) })
            .await
    }
}

/// `Authorization` value for `token`, flagged sensitive so it is redacted
/// from `Debug` output.
fn bearer_header(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| GraphError::Auth {
        message: "access token is not a valid header value".to_string(),
        source: Some(Box::new(e)),
    })?;
    value.set_sensitive(true);
    Ok(value)
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| GraphError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(GraphError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "cannot be a base".to_string(),
        });
    }
    Ok(url)
}

/// Whether `status` counts as success: any 2xx except `202 Accepted`.
pub fn is_success(status: StatusCode) -> bool {
    status.is_success() && status != StatusCode::ACCEPTED
}

/// Checks a response for errors.
///
/// Success statuses pass through untouched. Otherwise the body is read in
/// full and decoded as an OData error envelope; the buffered body is
/// re-attached to the response held by the returned [`ApiError`].
pub async fn check_response(method: &Method, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if is_success(status) {
        return Ok(response);
    }

    let version = response.version();
    let headers = response.headers().clone();
    let data = response.bytes().await.map_err(|source| GraphError::ReadErrorBody {
        method: method.clone(),
        status,
        source,
    })?;

    let envelope: ODataEnvelope = serde_json::from_slice(&data).map_err(|source| {
        GraphError::MalformedErrorBody {
            method: method.clone(),
            status,
            body: String::from_utf8_lossy(&data).into_owned(),
            source,
        }
    })?;

    let mut rebuilt = http::Response::new(data);
    *rebuilt.status_mut() = status;
    *rebuilt.version_mut() = version;
    *rebuilt.headers_mut() = headers;

    let err = ApiError::new(method.clone(), rebuilt, envelope.error.unwrap_or_default());
    warn!(
        %method,
        status = status.as_u16(),
        code = err.code().unwrap_or_default(),
        request_id = err.request_id().unwrap_or_default(),
        "graph api error"
    );
    Err(err.into())
}
