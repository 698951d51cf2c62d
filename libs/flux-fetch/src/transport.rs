//! The fetch-like primitive the normalizer is built on.
//!
//! The normalizer never reaches for a global client: every call receives a
//! [`Transport`] explicitly. [`HyperTransport`](crate::HyperTransport) is the
//! production implementation; tests plug in an in-memory one.

use crate::body::{FormData, RequestBody};
use crate::error::FetchError;
use crate::headers::Headers;
use crate::options::Credentials;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// What the transport receives for a single exchange
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// Method exactly as the caller wrote it
    pub method: String,
    pub headers: Headers,
    /// Encoded payload; `None` means no body is sent at all
    pub body: Option<RequestBody>,
    pub credentials: Option<Credentials>,
    /// Caller options the normalizer does not interpret
    pub extensions: Map<String, Value>,
}

/// Performs one request/response exchange
#[async_trait]
pub trait Transport: Send + Sync {
    type Response: TransportResponse;

    /// Send `request` to `path`.
    ///
    /// Any status code is a successful exchange; only failures to complete
    /// the round trip are errors.
    async fn fetch(
        &self,
        path: &str,
        request: TransportRequest,
    ) -> Result<Self::Response, FetchError>;
}

/// Response handed back by a [`Transport`].
///
/// Body readers consume the response; status and headers must be read first.
#[async_trait]
pub trait TransportResponse: Send + Sized {
    fn status(&self) -> u16;

    fn status_text(&self) -> &str;

    fn headers(&self) -> &Headers;

    async fn json(self) -> Result<Value, FetchError>;

    async fn form_data(self) -> Result<FormData, FetchError>;

    async fn text(self) -> Result<String, FetchError>;
}
