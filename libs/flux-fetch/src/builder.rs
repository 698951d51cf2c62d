use crate::client::{HyperTransport, InnerService, validate_url};
use crate::config::{HyperTransportConfig, TlsRootConfig, TransportSecurity};
use crate::error::FetchError;
use crate::layers::DefaultHeadersLayer;
use crate::response::BoxedBody;
use crate::tls;
use bytes::Bytes;
use http::Response;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;
use tower_http::decompression::DecompressionLayer;

/// Builder for [`HyperTransport`]
pub struct HyperTransportBuilder {
    config: HyperTransportConfig,
}

impl HyperTransportBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: HyperTransportConfig::default(),
        }
    }

    /// Create a builder from an existing configuration
    #[must_use]
    pub fn with_config(config: HyperTransportConfig) -> Self {
        Self { config }
    }

    /// Set the origin that relative paths are resolved against
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Set the User-Agent sent when the request has none
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the maximum response body size in bytes
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set the transport security mode
    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Set the TLS root certificate strategy
    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// Allow insecure HTTP connections (for testing only)
    ///
    /// Equivalent to `.transport(TransportSecurity::AllowInsecureHttp)`.
    ///
    /// Only available in debug builds or with the `allow-insecure-http` feature.
    #[must_use]
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        tracing::warn!(
            target: "flux_fetch::security",
            "allow_insecure_http() called - HTTP traffic will NOT be encrypted"
        );
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Build the transport
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails, the user agent is not a
    /// valid header value, or the base URL is not an acceptable absolute URL
    pub fn build(self) -> Result<HyperTransport, FetchError> {
        if self.config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                "insecure HTTP enabled (TransportSecurity::AllowInsecureHttp); \
                 use only for testing with mock servers"
            );
        }

        let base_url = match self.config.base_url {
            Some(base) => {
                validate_url(&base, self.config.transport)?;
                Some(base)
            }
            None => None,
        };

        let https = tls::https_connector(self.config.tls_roots, self.config.transport)?;
        let hyper_client = Client::builder(TokioExecutor::new()).build::<_, Full<Bytes>>(https);

        let headers_layer = DefaultHeadersLayer::try_new(&self.config.user_agent)?;

        // Request flow: DefaultHeaders -> Decompression -> hyper_client
        let service = ServiceBuilder::new()
            .layer(headers_layer)
            .layer(DecompressionLayer::new())
            .service(hyper_client)
            .map_response(map_decompression_response)
            .map_err(FetchError::from);

        let service: InnerService = BoxCloneSyncService::new(service);

        tracing::debug!(
            base_url = base_url.as_deref().unwrap_or_default(),
            max_body_size = self.config.max_body_size,
            "hyper transport built"
        );

        Ok(HyperTransport {
            service,
            base_url,
            max_body_size: self.config.max_body_size,
            transport_security: self.config.transport,
        })
    }
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Box the decompressed body into the transport's response body type
fn map_decompression_response<B>(response: Response<B>) -> Response<BoxedBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = response.into_parts();
    let boxed_body: BoxedBody = body.map_err(Into::into).boxed();
    Response::from_parts(parts, boxed_body)
}
