use crate::body::ResponseBody;
use crate::headers::Headers;
use crate::response::NormalizedResponse;
use std::fmt;
use thiserror::Error;

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
}

/// A completed exchange whose status fell outside `200..300`.
///
/// Carries everything the normalized response had, so callers can inspect
/// the server's answer and decide whether to retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestError {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl RequestError {
    /// Status text when the server sent one, otherwise the body rendered as text.
    #[must_use]
    pub fn message(&self) -> String {
        if self.status_text.is_empty() {
            self.body.to_string()
        } else {
            self.status_text.clone()
        }
    }
}

impl From<NormalizedResponse> for RequestError {
    fn from(response: NormalizedResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: response.body,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for RequestError {}

/// Errors raised while shaping, sending or reading a request
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FetchError {
    /// A body was supplied together with the GET method
    #[error("Only `GET` requests can contain a `body`")]
    InvalidRequest,

    /// The authenticated wrapper was called without a token
    #[error("Must provide a `fluxToken` to `fluxFetch`")]
    MissingToken,

    /// Response status outside `200..300`
    #[error(transparent)]
    Status(Box<RequestError>),

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Method string is not a valid HTTP token
    #[error("Invalid method '{0}'")]
    InvalidMethod(String),

    /// Request building failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// JSON encoding or parsing error
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Form body could not be encoded or decoded
    #[error("Invalid form data: {0}")]
    InvalidFormData(String),

    /// Transport error (network, connection, etc)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Invalid URL (failed to parse)
    ///
    /// Use the `kind` field for programmatic matching. The `reason` field is
    /// a diagnostic message for logging only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        /// The URL that failed to parse
        url: String,
        /// Structured failure classification for programmatic matching
        kind: InvalidUriKind,
        /// Diagnostic message (unstable format, for logging only)
        reason: String,
    },

    /// Invalid URL scheme for transport security configuration
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme {
        /// The URL scheme that was rejected
        scheme: String,
        /// Reason the scheme was rejected
        reason: String,
    },
}

impl FetchError {
    /// The status failure carried by this error, if it is one.
    #[must_use]
    pub fn as_request_error(&self) -> Option<&RequestError> {
        match self {
            FetchError::Status(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RequestError> for FetchError {
    fn from(err: RequestError) -> Self {
        FetchError::Status(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for FetchError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        FetchError::Transport(Box::new(err))
    }
}
