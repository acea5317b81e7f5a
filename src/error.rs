//! Typed error hierarchy for the aad-approles crate.
//!
//! Variants map to the failure boundaries a call can cross:
//! - `Auth` covers the Azure AD token endpoint.
//! - `Cancelled` / `DeadlineExceeded` come from the caller's
//!   [`CallContext`](crate::context::CallContext).
//! - `Network` wraps transport failures that never produced a status code.
//! - `Api` carries a decoded OData error envelope for non-success statuses.
//! - `ReadErrorBody` / `MalformedErrorBody` cover error responses whose body
//!   could not be read or did not match the OData envelope.
//! - `Parse` covers success bodies that did not match the expected shape.
//! - `MissingField` rejects incomplete inputs before any request is built.

use std::fmt;

use bytes::Bytes;
use reqwest::{Method, StatusCode};
use serde::Deserialize;

/// Unified error type for all library operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Token acquisition failed: bad credentials, an unreachable token
    /// endpoint, or an unexpected token response shape.
    #[error("authentication failed: {message}")]
    Auth {
        /// Status and AADSTS body when the endpoint answered.
        message: String,
        /// Underlying transport or decode error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The caller's cancellation token fired before the call completed.
    #[error("context cancelled")]
    Cancelled,

    /// The caller's deadline passed before the call completed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Transport-level failure (DNS, TCP, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The Graph API answered with a non-success status and an OData error
    /// envelope.
    #[error(transparent)]
    Api(Box<ApiError>),

    /// The body of an error response could not be read.
    #[error("could not read error body ({method}: {status}): {source}")]
    ReadErrorBody {
        /// Method of the failed request.
        method: Method,
        /// Status the server answered with.
        status: StatusCode,
        /// Error raised while reading the body.
        #[source]
        source: reqwest::Error,
    },

    /// An error response body was not a JSON OData error envelope.
    #[error("{method}: {status} unparseable error body: {source}")]
    MalformedErrorBody {
        /// Method of the failed request.
        method: Method,
        /// Status the server answered with.
        status: StatusCode,
        /// Raw body text, lossily decoded.
        body: String,
        /// Why the body did not decode.
        #[source]
        source: serde_json::Error,
    },

    /// A success body did not match the expected JSON shape.
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// A relative path could not be resolved against the base URL.
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured API base URL is not a usable base.
    #[error("invalid api base url {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The rejected URL as configured.
        url: String,
        /// Parser error or other rejection reason.
        reason: String,
    },

    /// A required input identifier was absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl From<ApiError> for GraphError {
    fn from(err: ApiError) -> Self {
        GraphError::Api(Box::new(err))
    }
}

/// Convenience alias used throughout the library.
pub type Result<T> = std::result::Result<T, GraphError>;

/// `{"odata.error": {...}}` wrapper returned by Graph on failure.
#[derive(Debug, Deserialize)]
pub(crate) struct ODataEnvelope {
    #[serde(rename = "odata.error", default)]
    pub(crate) error: Option<ODataError>,
}

/// OData error information.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ODataError {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub message: Option<ODataErrorMessage>,
    /// Request id generated by Graph for the failed call.
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Language-tagged OData error message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ODataErrorMessage {
    /// Language tag, e.g. `en`.
    #[serde(default)]
    pub lang: Option<String>,
    /// Message text.
    #[serde(default)]
    pub value: Option<String>,
}

/// A Graph API error response.
///
/// The response body is fully buffered before decoding and re-attached to
/// `response`, so it can be read again from the start as many times as
/// needed via [`ApiError::body`] or [`ApiError::into_response`].
#[derive(Debug)]
pub struct ApiError {
    method: Method,
    response: http::Response<Bytes>,
    odata: ODataError,
}

impl ApiError {
    pub(crate) fn new(method: Method, response: http::Response<Bytes>, odata: ODataError) -> Self {
        ApiError {
            method,
            response,
            odata,
        }
    }

    /// Method of the request that failed.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// The decoded `odata.error` object.
    pub fn odata(&self) -> &ODataError {
        &self.odata
    }

    /// OData error code, e.g. `Authorization_RequestDenied`.
    pub fn code(&self) -> Option<&str> {
        self.odata.code.as_deref()
    }

    /// OData error message text.
    pub fn message(&self) -> Option<&str> {
        self.odata
            .message
            .as_ref()
            .and_then(|m| m.value.as_deref())
    }

    /// Graph request id, useful when reporting a failure to Microsoft.
    pub fn request_id(&self) -> Option<&str> {
        self.odata.request_id.as_deref()
    }

    /// The re-attached response, headers and body included.
    pub fn response(&self) -> &http::Response<Bytes> {
        &self.response
    }

    /// Original response body bytes.
    pub fn body(&self) -> &[u8] {
        self.response.body()
    }

    /// Rebuilds a readable `reqwest::Response` carrying the original status,
    /// headers and body.
    pub fn into_response(self) -> reqwest::Response {
        reqwest::Response::from(self.response)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} {}",
            self.method,
            self.status().as_u16(),
            self.code().unwrap_or_default(),
            self.message().unwrap_or_default()
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn api_error(status: u16, body: &str) -> ApiError {
        let envelope: ODataEnvelope = serde_json::from_str(body).unwrap();
        let response = http::Response::builder()
            .status(status)
            .body(Bytes::from(body.to_owned()))
            .unwrap();
        ApiError::new(Method::GET, response, envelope.error.unwrap_or_default())
    }

    #[test]
    fn api_error_display_matches_graph_format() {
        let err = api_error(
            403,
            r#"{"odata.error":{"code":"Authorization_RequestDenied","message":{"lang":"en","value":"Insufficient privileges"}}}"#,
        );
        assert_eq!(
            err.to_string(),
            "GET: 403 Authorization_RequestDenied Insufficient privileges"
        );
    }

    #[test]
    fn api_error_exposes_envelope_fields() {
        let err = api_error(
            404,
            r#"{"odata.error":{"code":"Request_ResourceNotFound","message":{"lang":"en","value":"gone"},"requestId":"req-42"}}"#,
        );
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), Some("Request_ResourceNotFound"));
        assert_eq!(err.message(), Some("gone"));
        assert_eq!(err.request_id(), Some("req-42"));
        assert_eq!(
            err.odata().message.as_ref().unwrap().lang.as_deref(),
            Some("en")
        );
    }

    #[test]
    fn api_error_without_code_or_message_still_formats() {
        let err = api_error(500, r#"{"somethingElse": true}"#);
        assert_eq!(err.to_string(), "GET: 500  ");
        assert!(err.code().is_none());
        assert!(err.message().is_none());
    }

    #[test]
    fn api_error_body_can_be_read_repeatedly() {
        let body = r#"{"odata.error":{"code":"X","message":{"lang":"en","value":"y"}}}"#;
        let err = api_error(400, body);
        assert_eq!(err.body(), body.as_bytes());
        assert_eq!(err.body(), body.as_bytes());
    }

    #[test]
    fn graph_error_wraps_api_error_transparently() {
        let err: GraphError = api_error(
            409,
            r#"{"odata.error":{"code":"Conflict","message":{"lang":"en","value":"exists"}}}"#,
        )
        .into();
        assert_eq!(err.to_string(), "GET: 409 Conflict exists");
    }

    #[test]
    fn auth_error_with_source_chains_correctly() {
        let json_err = serde_json::from_str::<String>("not-json").unwrap_err();
        let err = GraphError::Auth {
            message: "failed to parse token response".to_string(),
            source: Some(Box::new(json_err)),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("authentication failed"));
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = GraphError::MissingField("group_id");
        assert_eq!(err.to_string(), "missing required field: group_id");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GraphError>();
    }
}
