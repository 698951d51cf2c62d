use crate::body::RequestBody;
use crate::error::FetchError;
use crate::headers::Headers;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Method used when the caller does not pick one
pub const DEFAULT_METHOD: &str = "get";

/// Whether the transport should attach ambient credentials (cookies,
/// authorization) to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    Omit,
    SameOrigin,
    Include,
}

impl Credentials {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Credentials::Omit => "omit",
            Credentials::SameOrigin => "same-origin",
            Credentials::Include => "include",
        }
    }
}

/// Options for a single request.
///
/// Built fluently. Header errors are captured and surfaced when the request
/// is prepared, so the chain never needs `?` in the middle.
///
/// ```ignore
/// let options = RequestOptions::new()
///     .method("post")
///     .header("x-request-id", "abc123")
///     .json(&NewUser { name: "Alice" })?;
/// ```
#[derive(Debug, Default)]
#[must_use = "RequestOptions does nothing until passed to a request"]
pub struct RequestOptions {
    pub(crate) method: Option<String>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) headers: Headers,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) extensions: Map<String, Value>,
    /// Error captured during building (deferred to preparation)
    pub(crate) error: Option<FetchError>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP method, compared case-insensitively and sent as written
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Use a serializable value as the body
    ///
    /// # Errors
    /// Returns `Err(FetchError::Json)` if serialization fails.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, FetchError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.body = Some(RequestBody::json(body)?);
        Ok(self)
    }

    /// Add a header; a later call with the same name (any case) replaces it
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(e) = self.headers.insert(name, value) {
            self.error = Some(e);
        }
        self
    }

    /// Lay a whole header collection over the current headers
    pub fn headers(mut self, headers: &Headers) -> Self {
        self.headers.overlay(headers);
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Transport-specific option handed to the transport verbatim
    pub fn extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn get_method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    #[must_use]
    pub fn get_body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn get_headers(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn get_credentials(&self) -> Option<Credentials> {
        self.credentials
    }

    #[must_use]
    pub fn get_extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }

    /// Attach a flux token, turning these options into [`AuthOptions`]
    pub fn with_flux_token(self, token: impl Into<String>) -> AuthOptions {
        AuthOptions::from(self).flux_token(token)
    }
}

/// Options for [`flux_request`](crate::flux_request): a flux token plus
/// ordinary request options forwarded to the normalizer.
#[derive(Debug, Default)]
#[must_use = "AuthOptions does nothing until passed to a request"]
pub struct AuthOptions {
    pub(crate) flux_token: Option<SecretString>,
    pub(crate) options: RequestOptions,
}

impl AuthOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flux_token(mut self, token: impl Into<String>) -> Self {
        self.flux_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.flux_token.is_some()
    }
}

impl From<RequestOptions> for AuthOptions {
    fn from(options: RequestOptions) -> Self {
        Self {
            flux_token: None,
            options,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_collects_fields() {
        let options = RequestOptions::new()
            .method("post")
            .header("foo", "bar")
            .credentials(Credentials::SameOrigin)
            .extension("lalala", json!("another field"))
            .body("BODY");

        assert_eq!(options.get_method(), Some("post"));
        assert_eq!(options.get_headers().get("Foo"), Some("bar"));
        assert_eq!(options.get_credentials(), Some(Credentials::SameOrigin));
        assert_eq!(options.get_extensions().get("lalala"), Some(&json!("another field")));
        assert_eq!(options.get_body(), Some(&RequestBody::Text("BODY".into())));
    }

    #[test]
    fn test_header_error_is_deferred_and_sticky() {
        let options = RequestOptions::new()
            .header("bad header", "x")
            .header("good", "y");

        assert!(matches!(options.error, Some(FetchError::InvalidHeaderName(_))));
        assert!(options.get_headers().is_empty());
        assert!(options.json(&json!({})).is_err());
    }

    #[test]
    fn test_credentials_wire_names() {
        assert_eq!(Credentials::Include.as_str(), "include");
        assert_eq!(
            serde_json::to_value(Credentials::SameOrigin).unwrap(),
            json!("same-origin")
        );
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let auth = RequestOptions::new().with_flux_token("SECRET_TOKEN");
        assert!(auth.has_token());
        assert!(!format!("{auth:?}").contains("SECRET_TOKEN"));
    }
}
