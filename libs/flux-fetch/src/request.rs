use crate::body::{RequestBody, ResponseBody};
use crate::error::{FetchError, RequestError};
use crate::headers::{FORM_DATA_MIME, JSON_MIME, mime_contains};
use crate::options::{DEFAULT_METHOD, RequestOptions};
use crate::response::NormalizedResponse;
use crate::transport::{Transport, TransportRequest, TransportResponse};
use http::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value;

/// Content type applied when the caller did not set one
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Request options resolved into exactly what the transport will receive.
///
/// Construction is synchronous and performs every caller-side check, so an
/// invalid request is rejected before any I/O takes place.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    request: TransportRequest,
}

impl PreparedRequest {
    /// Resolve method, content type and payload.
    ///
    /// # Errors
    /// - `FetchError::InvalidRequest` if a body accompanies a GET request
    /// - a header error captured while building `options`
    /// - `FetchError::Json` if a JSON body cannot be serialized
    pub fn new(options: RequestOptions) -> Result<Self, FetchError> {
        let RequestOptions {
            method,
            body,
            mut headers,
            credentials,
            extensions,
            error,
        } = options;

        if let Some(e) = error {
            return Err(e);
        }

        // A JSON null is no body at all
        let body = body.filter(|body| !matches!(body, RequestBody::Json(Value::Null)));

        let method = method.unwrap_or_else(|| DEFAULT_METHOD.to_owned());
        if body.is_some() && method.eq_ignore_ascii_case("get") {
            return Err(FetchError::InvalidRequest);
        }

        let content_type = headers
            .get_value(CONTENT_TYPE.as_str())
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let is_json = mime_contains(content_type.as_bytes(), JSON_MIME);
        tracing::trace!(
            content_type = ?content_type,
            is_json,
            "resolved request content type"
        );
        headers.insert_value(CONTENT_TYPE, content_type);

        let body = match body {
            Some(body) if is_json => Some(RequestBody::Text(body.to_json_text()?)),
            other => other,
        };

        Ok(Self {
            request: TransportRequest {
                method,
                headers,
                body,
                credentials,
                extensions,
            },
        })
    }

    #[must_use]
    pub fn transport_request(&self) -> &TransportRequest {
        &self.request
    }

    #[must_use]
    pub fn into_transport_request(self) -> TransportRequest {
        self.request
    }

    /// Hand the request to `transport` and normalize whatever comes back.
    ///
    /// # Errors
    /// Returns `FetchError::Status` for a non-2xx response; transport and
    /// parsing failures are returned unchanged.
    pub async fn send<T>(self, transport: &T, path: &str) -> Result<NormalizedResponse, FetchError>
    where
        T: Transport + ?Sized,
    {
        tracing::debug!(
            method = %self.request.method,
            path,
            payload = self.request.body.as_ref().map_or("none", RequestBody::kind),
            "dispatching request"
        );

        let response = transport.fetch(path, self.request).await?;
        let normalized = parse_response(response).await?;
        check_status(normalized)
    }
}

/// Send a request through `transport`.
///
/// The method defaults to `get`. Without a content-type header the request is
/// sent as `application/json`, and with a JSON content type the body is
/// serialized to JSON text; any other content type passes the body through
/// untouched. The response body is parsed as JSON, form data or text based on
/// the response content type.
///
/// # Errors
/// - `FetchError::InvalidRequest` for a GET request with a body, before the
///   transport is touched
/// - `FetchError::Status` when the response status is outside `200..300`
/// - whatever the transport or the body parser reports, unchanged
///
/// # Example
///
/// ```ignore
/// let transport = HyperTransport::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// let response = request(
///     &transport,
///     "/users",
///     RequestOptions::new().method("post").json(&NewUser { name: "Alice" })?,
/// )
/// .await?;
/// ```
pub async fn request<T>(
    transport: &T,
    path: &str,
    options: RequestOptions,
) -> Result<NormalizedResponse, FetchError>
where
    T: Transport + ?Sized,
{
    PreparedRequest::new(options)?.send(transport, path).await
}

/// Read the body with the parser the response content type selects
///
/// # Errors
/// Returns the body reader's error unchanged.
pub async fn parse_response<R: TransportResponse>(
    response: R,
) -> Result<NormalizedResponse, FetchError> {
    let status = response.status();
    let status_text = response.status_text().to_owned();
    let headers = response.headers().clone();
    let content_type = headers.content_type().as_bytes();

    let body = if mime_contains(content_type, JSON_MIME) {
        ResponseBody::Json(response.json().await?)
    } else if mime_contains(content_type, FORM_DATA_MIME) {
        ResponseBody::FormData(response.form_data().await?)
    } else {
        ResponseBody::Text(response.text().await?)
    };

    tracing::debug!(status, body = body.kind(), "parsed response");

    Ok(NormalizedResponse {
        body,
        status,
        status_text,
        headers,
    })
}

/// Turn a response outside `200..300` into `FetchError::Status`
///
/// # Errors
/// Returns `FetchError::Status` carrying the whole response when the status
/// is not a success.
pub fn check_status(response: NormalizedResponse) -> Result<NormalizedResponse, FetchError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(RequestError::from(response).into())
    }
}
