use crate::body::{FormData, ResponseBody};
use crate::error::FetchError;
use crate::headers::Headers;
use crate::multipart;
use crate::transport::TransportResponse;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fmt;

/// Uniform result of a successful request, whatever the payload format
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub body: ResponseBody,
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
}

impl NormalizedResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Type-erased response body after decompression
pub type BoxedBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Response produced by [`HyperTransport`](crate::HyperTransport).
///
/// Body readers buffer the whole (decompressed) payload and enforce the
/// configured `max_body_size`.
pub struct HyperResponse {
    status: StatusCode,
    status_text: String,
    headers: Headers,
    body: BoxedBody,
    max_body_size: usize,
}

impl HyperResponse {
    pub(crate) fn new(response: Response<BoxedBody>, max_body_size: usize) -> Self {
        let (parts, body) = response.into_parts();
        // HTTP/1 servers may send their own reason phrase; prefer it
        let status_text = parts
            .extensions
            .get::<hyper::ext::ReasonPhrase>()
            .map(|reason| String::from_utf8_lossy(reason.as_bytes()).into_owned())
            .or_else(|| parts.status.canonical_reason().map(str::to_owned))
            .unwrap_or_default();

        Self {
            status: parts.status,
            status_text,
            headers: Headers::from(parts.headers),
            body,
            max_body_size,
        }
    }

    /// Read the whole body, failing with `BodyTooLarge` past the limit
    ///
    /// # Errors
    /// Returns `FetchError::BodyTooLarge` if the body exceeds the limit, or
    /// `FetchError::Transport` if reading fails.
    pub async fn bytes(self) -> Result<Bytes, FetchError> {
        read_body_limited(self.body, self.max_body_size).await
    }

    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

impl fmt::Debug for HyperResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .field("headers", &self.headers)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TransportResponse for HyperResponse {
    fn status(&self) -> u16 {
        self.status.as_u16()
    }

    fn status_text(&self) -> &str {
        &self.status_text
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    async fn json(self) -> Result<Value, FetchError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn form_data(self) -> Result<FormData, FetchError> {
        let content_type = self.headers.content_type().to_owned();
        let bytes = self.bytes().await?;
        multipart::parse_form_data(&content_type, &bytes)
    }

    async fn text(self) -> Result<String, FetchError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Collect `body`, enforcing the byte limit on decompressed data
pub(crate) async fn read_body_limited(body: BoxedBody, limit: usize) -> Result<Bytes, FetchError> {
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(FetchError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(FetchError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
