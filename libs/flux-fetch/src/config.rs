/// Default User-Agent string for outgoing requests
pub const DEFAULT_USER_AGENT: &str = concat!("flux-fetch/", env!("CARGO_PKG_VERSION"));

/// Default response body limit (10 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Transport security configuration
///
/// Controls whether the transport enforces TLS or allows plain HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only) - default and recommended
    #[default]
    TlsOnly,
    /// Allow insecure HTTP connections (for testing with mock servers only)
    ///
    /// **WARNING**: Never use in production; traffic can be intercepted.
    AllowInsecureHttp,
}

/// Configuration of [`HyperTransport`](crate::HyperTransport)
#[derive(Debug, Clone)]
pub struct HyperTransportConfig {
    /// Origin that relative paths such as `/users` are resolved against
    /// (default: none, every path must be an absolute URL)
    pub base_url: Option<String>,

    /// User-Agent header value, sent unless the request carries its own
    pub user_agent: String,

    /// Maximum response body size in bytes, after decompression (default: 10 MB)
    pub max_body_size: usize,

    /// Transport security mode (default: `TlsOnly`)
    pub transport: TransportSecurity,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,
}

impl Default for HyperTransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
        }
    }
}

impl HyperTransportConfig {
    /// Create configuration for testing with mock servers (allows insecure HTTP)
    ///
    /// **WARNING**: Use only for local testing with mock servers, never in production.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_body_size: 1024 * 1024, // 1 MB
            transport: TransportSecurity::AllowInsecureHttp,
            ..Self::default()
        }
    }
}
