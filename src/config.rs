//! Endpoint configuration for the Azure AD Graph API.
//!
//! Every URL, scope and version string the client touches lives in
//! [`GraphConfig`]. The defaults target the public Azure cloud and Graph API
//! version `1.6`. Tests point the config at a wiremock server; host programs
//! can deserialize it from their own config files (missing keys fall back to
//! the defaults, durations are given in whole seconds).

use std::time::Duration;

use serde::Deserialize;

/// Azure AD Graph endpoint base URL.
pub const GRAPH_API_BASE_URL: &str = "https://graph.windows.net/";

/// Azure AD v1 token endpoint for two-legged OAuth. `{tenant_id}` is replaced
/// at runtime.
pub const GRAPH_TOKEN_URL: &str = "https://login.microsoftonline.com/{tenant_id}/oauth2/token";

/// Default token scope for the Graph endpoint.
pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.windows.net/.default";

/// Graph API version appended to every request as `api-version`.
pub const API_VERSION: &str = "1.6";

/// Connect timeout (TCP + TLS handshake) for API and token requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Static configuration handed to [`GraphClient`](crate::client::GraphClient)
/// at construction time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Base URL every relative request path is resolved against.
    pub api_base_url: String,
    /// Token endpoint template containing a `{tenant_id}` placeholder.
    pub token_url_template: String,
    /// Scope requested in the client-credentials grant.
    pub default_scope: String,
    /// Value of the `api-version` query parameter.
    pub api_version: String,
    /// Connect timeout (TCP + TLS handshake).
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    /// Whole-request timeout. `None` leaves requests unbounded; callers bound
    /// individual calls with a [`CallContext`](crate::context::CallContext)
    /// deadline instead.
    #[serde(with = "opt_secs")]
    pub request_timeout: Option<Duration>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            api_base_url: GRAPH_API_BASE_URL.to_string(),
            token_url_template: GRAPH_TOKEN_URL.to_string(),
            default_scope: GRAPH_DEFAULT_SCOPE.to_string(),
            api_version: API_VERSION.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: None,
        }
    }
}

impl GraphConfig {
    /// Token endpoint for the given tenant.
    pub fn token_url(&self, tenant_id: &str) -> String {
        self.token_url_template.replace("{tenant_id}", tenant_id)
    }

    /// Sets `api_base_url`.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets `token_url_template`.
    pub fn with_token_url_template(mut self, template: impl Into<String>) -> Self {
        self.token_url_template = template.into();
        self
    }

    /// Sets `default_scope`.
    pub fn with_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scope = scope.into();
        self
    }

    /// Sets `api_version`.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Bounds every request by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod opt_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
