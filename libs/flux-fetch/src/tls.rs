//! TLS connector construction for the hyper transport.

use crate::config::{TlsRootConfig, TransportSecurity};
use crate::error::FetchError;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use std::sync::Arc;

/// Crypto provider for TLS connections.
///
/// Uses the process-wide default when one has been installed, otherwise an
/// aws-lc-rs provider that is not installed globally.
pub fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Build the connector for the given root store and security mode.
///
/// ALPN advertises both h2 and http/1.1.
///
/// # Errors
/// Returns `FetchError::Tls` if the root store cannot be loaded.
pub fn https_connector(
    roots: TlsRootConfig,
    security: TransportSecurity,
) -> Result<HttpsConnector<HttpConnector>, FetchError> {
    let provider = crypto_provider();
    let builder = match roots {
        TlsRootConfig::WebPki => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)
            .map_err(|e| FetchError::Tls(Box::new(e)))?,
        TlsRootConfig::Native => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_native_roots(provider)
            .map_err(|e| FetchError::Tls(Box::new(e)))?,
    };

    let connector = match security {
        TransportSecurity::AllowInsecureHttp => {
            builder.https_or_http().enable_all_versions().build()
        }
        TransportSecurity::TlsOnly => builder.https_only().enable_all_versions().build(),
    };
    Ok(connector)
}
