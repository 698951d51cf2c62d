use crate::body::RequestBody;
use crate::builder::HyperTransportBuilder;
use crate::config::TransportSecurity;
use crate::error::{FetchError, InvalidUriKind};
use crate::headers::mime_contains;
use crate::multipart;
use crate::options::Credentials;
use crate::response::{BoxedBody, HyperResponse};
use crate::transport::{Transport, TransportRequest};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue};
use http::{Request, Response};
use http_body_util::Full;
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;

/// Type-erased service stack behind the transport
pub(crate) type InnerService = BoxCloneSyncService<Request<Full<Bytes>>, Response<BoxedBody>, FetchError>;

const FORM_URLENCODED_MIME: &str = "application/x-www-form-urlencoded";

/// Production [`Transport`] on hyper with rustls.
///
/// Relative paths are resolved against the configured base URL. Response
/// bodies are decompressed transparently and capped at `max_body_size`.
///
/// `HyperTransport` is `Clone + Send + Sync`; cloning shares the connection pool.
///
/// # Example
///
/// ```ignore
/// let transport = HyperTransport::builder()
///     .base_url("https://flux.example.com")
///     .user_agent("my-app/1.0")
///     .build()?;
///
/// let response = flux_request(
///     &transport,
///     "/api/things",
///     AuthOptions::new().flux_token(token),
/// )
/// .await?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    pub(crate) service: InnerService,
    pub(crate) base_url: Option<String>,
    pub(crate) max_body_size: usize,
    pub(crate) transport_security: TransportSecurity,
}

impl HyperTransport {
    /// Create a transport with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, FetchError> {
        HyperTransportBuilder::new().build()
    }

    /// Create a builder for configuring the transport
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Resolve `path` into the URI the request goes to.
    ///
    /// Absolute `scheme://` URLs are used as they are; anything else is
    /// joined onto the base URL.
    ///
    /// # Errors
    /// Returns `FetchError::InvalidUri` if the result is not an absolute URL,
    /// or `FetchError::InvalidScheme` if the scheme is not allowed.
    pub fn resolve_url(&self, path: &str) -> Result<http::Uri, FetchError> {
        let url = match &self.base_url {
            Some(base) if !is_absolute_url(path) => join_url(base, path),
            _ => path.to_owned(),
        };
        validate_url(&url, self.transport_security)
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("base_url", &self.base_url)
            .field("max_body_size", &self.max_body_size)
            .field("transport_security", &self.transport_security)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HyperTransport {
    type Response = HyperResponse;

    async fn fetch(
        &self,
        path: &str,
        request: TransportRequest,
    ) -> Result<HyperResponse, FetchError> {
        let uri = self.resolve_url(path)?;
        let method = parse_method(&request.method)?;

        let TransportRequest {
            headers,
            body,
            credentials,
            extensions,
            ..
        } = request;

        if !extensions.is_empty() {
            tracing::trace!(
                count = extensions.len(),
                "transport extensions are not interpreted by the hyper transport"
            );
        }

        let mut headers = headers.into_header_map();
        if credentials == Some(Credentials::Omit) {
            headers.remove(COOKIE);
            headers.remove(AUTHORIZATION);
        }

        let body = match body {
            Some(body) => encode_body(body, &mut headers)?,
            None => Bytes::new(),
        };

        let mut request = Request::builder().method(method).uri(uri).body(Full::new(body))?;
        *request.headers_mut() = headers;

        let response = self.service.clone().oneshot(request).await?;
        Ok(HyperResponse::new(response, self.max_body_size))
    }
}

/// Parse a method string in any letter case
fn parse_method(method: &str) -> Result<http::Method, FetchError> {
    http::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| FetchError::InvalidMethod(method.to_owned()))
}

/// Turn a payload into wire bytes, completing the content type for forms
fn encode_body(body: RequestBody, headers: &mut HeaderMap) -> Result<Bytes, FetchError> {
    match body {
        RequestBody::Text(text) => Ok(Bytes::from(text)),
        RequestBody::Bytes(bytes) => Ok(bytes),
        RequestBody::Json(value) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
        RequestBody::Form(form) => {
            let content_type = headers
                .get(CONTENT_TYPE)
                .map(HeaderValue::as_bytes)
                .unwrap_or_default();
            if mime_contains(content_type, FORM_URLENCODED_MIME) {
                return multipart::encode_urlencoded(&form);
            }

            let boundary = std::str::from_utf8(content_type)
                .ok()
                .and_then(|ct| ct.parse::<mime::Mime>().ok())
                .and_then(|parsed| {
                    parsed
                        .get_param(mime::BOUNDARY)
                        .map(|b| b.as_str().trim_matches('"').to_owned())
                });
            let boundary = match boundary {
                Some(boundary) => boundary,
                None => {
                    let boundary = multipart::generate_boundary();
                    let value =
                        HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))?;
                    headers.insert(CONTENT_TYPE, value);
                    boundary
                }
            };
            Ok(multipart::encode_multipart(&form, &boundary))
        }
    }
}

/// A path is absolute only when it starts with a scheme; `://` inside a
/// query or fragment does not count
fn is_absolute_url(path: &str) -> bool {
    path.parse::<http::Uri>()
        .is_ok_and(|uri| uri.scheme().is_some())
}

fn join_url(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_owned();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Validate URL and scheme against the transport security mode.
pub(crate) fn validate_url(url: &str, security: TransportSecurity) -> Result<http::Uri, FetchError> {
    let uri: http::Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| FetchError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::ParseError,
            reason: e.to_string(),
        })?;

    if uri.authority().is_none() {
        return Err(FetchError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::MissingAuthority,
            reason: "missing host/authority".to_owned(),
        });
    }

    match uri.scheme_str() {
        Some("https") => Ok(uri),
        Some("http") => match security {
            TransportSecurity::AllowInsecureHttp => Ok(uri),
            TransportSecurity::TlsOnly => Err(FetchError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
            }),
        },
        Some(scheme) => Err(FetchError::InvalidScheme {
            scheme: scheme.to_owned(),
            reason: "only http:// and https:// schemes are supported".to_owned(),
        }),
        None => Err(FetchError::InvalidUri {
            url: url.to_owned(),
            kind: InvalidUriKind::MissingScheme,
            reason: "missing scheme".to_owned(),
        }),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::body::{FormData, ResponseBody};
    use crate::options::RequestOptions;
    use crate::request::request;
    use crate::transport::TransportResponse;
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_transport(server: &MockServer) -> HyperTransport {
        HyperTransportBuilder::new()
            .allow_insecure_http()
            .base_url(server.base_url())
            .build()
            .unwrap()
    }

    fn transport_request(method: &str) -> TransportRequest {
        TransportRequest {
            method: method.to_owned(),
            headers: crate::Headers::new(),
            body: None,
            credentials: None,
            extensions: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h", "/a"), "http://h/a");
        assert_eq!(join_url("http://h/", "a"), "http://h/a");
        assert_eq!(join_url("http://h/api/", "/v1/x?y=1"), "http://h/api/v1/x?y=1");
        assert_eq!(join_url("http://h", ""), "http://h");
    }

    #[test]
    fn test_url_in_query_is_still_relative() {
        let transport = HyperTransportBuilder::new()
            .base_url("https://api.example.com")
            .build()
            .unwrap();

        let uri = transport
            .resolve_url("/login?next=https://app.example.com/home")
            .unwrap();
        assert_eq!(
            uri.to_string(),
            "https://api.example.com/login?next=https://app.example.com/home"
        );

        let uri = transport.resolve_url("https://other.example.com/x").unwrap();
        assert_eq!(uri.host(), Some("other.example.com"));

        assert!(is_absolute_url("http://h/a"));
        assert!(!is_absolute_url("/a?b=http://c"));
        assert!(!is_absolute_url("a#http://c"));
    }

    #[test]
    fn test_validate_url_kinds() {
        let err = validate_url("/relative", TransportSecurity::AllowInsecureHttp).unwrap_err();
        assert!(matches!(
            err,
            FetchError::InvalidUri {
                kind: InvalidUriKind::MissingAuthority,
                ..
            }
        ));

        let err = validate_url("http://example.com", TransportSecurity::TlsOnly).unwrap_err();
        assert!(matches!(err, FetchError::InvalidScheme { .. }));

        let err = validate_url("ftp://example.com", TransportSecurity::AllowInsecureHttp).unwrap_err();
        assert!(matches!(err, FetchError::InvalidScheme { .. }));

        let err = validate_url("http://exa mple.com", TransportSecurity::AllowInsecureHttp).unwrap_err();
        assert!(matches!(
            err,
            FetchError::InvalidUri {
                kind: InvalidUriKind::ParseError,
                ..
            }
        ));

        assert!(validate_url("https://example.com/x", TransportSecurity::TlsOnly).is_ok());
    }

    #[test]
    fn test_parse_method_any_case() {
        assert_eq!(parse_method("post").unwrap(), http::Method::POST);
        assert_eq!(parse_method("Delete").unwrap(), http::Method::DELETE);
        assert!(matches!(parse_method("bad method"), Err(FetchError::InvalidMethod(_))));
    }

    #[test]
    fn test_encode_form_completes_multipart_content_type() {
        let mut form = FormData::new();
        form.append_text("a", "1");
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data"));

        let body = encode_body(RequestBody::Form(form.clone()), &mut headers).unwrap();

        let content_type = headers.get(CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert_eq!(multipart::parse_form_data(content_type, &body).unwrap(), form);
    }

    #[test]
    fn test_encode_form_keeps_given_boundary_and_urlencoded() {
        let mut form = FormData::new();
        form.append_text("a", "1");

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=fixed"),
        );
        let body = encode_body(RequestBody::Form(form.clone()), &mut headers).unwrap();
        assert!(body.starts_with(b"--fixed\r\n"));

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let body = encode_body(RequestBody::Form(form), &mut headers).unwrap();
        assert_eq!(body.as_ref(), b"a=1");
    }

    #[tokio::test]
    async fn test_relative_path_uses_base_url() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/items");
            then.status(200).body("ok");
        });

        let transport = test_transport(&server);
        let response = transport
            .fetch("/api/items", transport_request("get"))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.status_text(), "OK");
        mock.assert();
    }

    #[tokio::test]
    async fn test_absolute_url_bypasses_base_url() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/direct");
            then.status(204);
        });

        let transport = HyperTransportBuilder::new()
            .allow_insecure_http()
            .base_url("http://unused.invalid")
            .build()
            .unwrap();
        let url = format!("{}/direct", server.base_url());
        let response = transport.fetch(&url, transport_request("GET")).await.unwrap();

        assert_eq!(response.status(), 204);
        mock.assert();
    }

    #[tokio::test]
    async fn test_default_headers_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/ua")
                .header("user-agent", "custom/1.0")
                .header("accept", "*/*");
            then.status(200);
        });

        let transport = HyperTransportBuilder::new()
            .allow_insecure_http()
            .base_url(server.base_url())
            .user_agent("custom/1.0")
            .build()
            .unwrap();
        transport.fetch("/ua", transport_request("get")).await.unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_omit_credentials_strips_cookie_and_authorization() {
        let server = MockServer::start();
        let with_cookie = server.mock(|when, then| {
            when.method(GET).path("/creds").header_exists("cookie");
            then.status(200).body("cookie");
        });
        let without_cookie = server.mock(|when, then| {
            when.method(GET)
                .path("/creds")
                .header_missing("cookie")
                .header_missing("authorization");
            then.status(200).body("clean");
        });

        let transport = test_transport(&server);
        let mut sent = transport_request("get");
        sent.headers.insert("cookie", "session=1").unwrap();
        sent.headers.insert("authorization", "Bearer x").unwrap();
        sent.credentials = Some(Credentials::Omit);

        let body = transport.fetch("/creds", sent.clone()).await.unwrap().text().await.unwrap();
        assert_eq!(body, "clean");

        sent.credentials = Some(Credentials::Include);
        let body = transport.fetch("/creds", sent).await.unwrap().text().await.unwrap();
        assert_eq!(body, "cookie");

        with_cookie.assert();
        without_cookie.assert();
    }

    #[tokio::test]
    async fn test_body_size_limit() {
        let server = MockServer::start();
        let large_body = "x".repeat(4096);
        server.mock(|when, then| {
            when.method(GET).path("/large");
            then.status(200).body(&large_body);
        });

        let transport = HyperTransportBuilder::new()
            .allow_insecure_http()
            .base_url(server.base_url())
            .max_body_size(1024)
            .build()
            .unwrap();

        let result = request(&transport, "/large", RequestOptions::new()).await;
        assert!(matches!(result, Err(FetchError::BodyTooLarge { limit: 1024, .. })));
    }

    #[tokio::test]
    async fn test_json_post_round_trip() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/users")
                .header("content-type", "application/json")
                .json_body(json!({"name": "Alice"}));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({"id": 7}));
        });

        let transport = test_transport(&server);
        let options = RequestOptions::new()
            .method("post")
            .json(&json!({"name": "Alice"}))
            .unwrap();

        let response = request(&transport, "/users", options).await.unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.status_text, "Created");
        assert_eq!(response.body, ResponseBody::Json(json!({"id": 7})));
        mock.assert();
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported_before_sending() {
        let transport = HyperTransportBuilder::new().build().unwrap();
        let err = request(&transport, "/no-base", RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::InvalidUri { .. }));
    }

    #[test]
    fn test_transport_is_send_sync_clone() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<HyperTransport>();
    }
}
