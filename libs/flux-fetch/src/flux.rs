//! Flux-token aware wrapper over [`request`](crate::request).

use crate::error::FetchError;
use crate::headers::Headers;
use crate::options::{AuthOptions, Credentials, RequestOptions};
use crate::request::request;
use crate::response::NormalizedResponse;
use crate::transport::Transport;
use secrecy::{ExposeSecret, SecretString};

/// Header flagging a request as coming from a flux client
pub const FLUX_MARKER_HEADER: &str = "flux-request-marker";

/// Header carrying the flux token
pub const FLUX_TOKEN_HEADER: &str = "flux-request-token";

const FLUX_MARKER_VALUE: &str = "1";

/// Turn [`AuthOptions`] into plain request options.
///
/// The flux marker and token headers go in first and caller headers are laid
/// on top, so a caller header with the same name wins. Credentials default to
/// [`Credentials::Include`] unless the caller picked a mode.
///
/// # Errors
/// - `FetchError::MissingToken` if no token (or an empty one) was supplied
/// - `FetchError::InvalidHeaderValue` if the token cannot be sent as a header
pub fn authenticate(options: AuthOptions) -> Result<RequestOptions, FetchError> {
    let AuthOptions {
        flux_token,
        mut options,
    } = options;

    let token = flux_token
        .filter(|token| !token.expose_secret().is_empty())
        .ok_or(FetchError::MissingToken)?;

    let mut headers = Headers::new();
    headers.insert(FLUX_MARKER_HEADER, FLUX_MARKER_VALUE)?;
    headers.insert(FLUX_TOKEN_HEADER, token.expose_secret())?;
    headers.overlay(&options.headers);
    options.headers = headers;

    if options.credentials.is_none() {
        options.credentials = Some(Credentials::Include);
    }

    Ok(options)
}

/// Send a request carrying the flux marker and token headers.
///
/// Everything except the token and headers is forwarded to
/// [`request`](crate::request) as given, and its result comes back untouched.
///
/// # Errors
/// `FetchError::MissingToken` before any I/O when the token is absent,
/// otherwise any error [`request`](crate::request) returns.
///
/// # Example
///
/// ```ignore
/// let response = flux_request(
///     &transport,
///     "/some_endpoint",
///     RequestOptions::new().header("foo", "bar").with_flux_token(token),
/// )
/// .await?;
/// ```
pub async fn flux_request<T>(
    transport: &T,
    path: &str,
    options: AuthOptions,
) -> Result<NormalizedResponse, FetchError>
where
    T: Transport + ?Sized,
{
    let options = authenticate(options)?;
    request(transport, path, options).await
}

/// A transport paired with an optional default flux token.
///
/// ```ignore
/// let client = FluxClient::new(HyperTransport::builder().base_url(origin).build()?)
///     .with_token(token);
/// let response = client.flux_request("/things", AuthOptions::new()).await?;
/// ```
pub struct FluxClient<T> {
    transport: T,
    token: Option<SecretString>,
}

impl<T: Transport> FluxClient<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: None,
        }
    }

    /// Token used when a call does not bring its own
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Plain request without flux headers
    ///
    /// # Errors
    /// Same as [`request`](crate::request).
    pub async fn request(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<NormalizedResponse, FetchError> {
        request(&self.transport, path, options).await
    }

    /// Authenticated request; the call's own token takes precedence
    ///
    /// # Errors
    /// Same as [`flux_request`].
    pub async fn flux_request(
        &self,
        path: &str,
        mut options: AuthOptions,
    ) -> Result<NormalizedResponse, FetchError> {
        if options.flux_token.is_none()
            && let Some(token) = &self.token
        {
            options.flux_token = Some(SecretString::from(token.expose_secret().to_owned()));
        }
        flux_request(&self.transport, path, options).await
    }
}

impl<T> std::fmt::Debug for FluxClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluxClient")
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}
