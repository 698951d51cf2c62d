#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Request normalization over a fetch-like transport
//!
//! This crate provides:
//! - [`request`]: applies defaults to a request (method `get`, JSON content
//!   type), serializes JSON bodies, sends it through a [`Transport`] and
//!   decodes the response by its `Content-Type` (JSON, form data or text)
//! - [`flux_request`]: the same, with the flux marker and token headers
//!   added and credentials included
//! - [`HyperTransport`]: a hyper/rustls transport with transparent
//!   response decompression and a response body size limit
//!
//! Non-2xx responses become [`FetchError::Status`] carrying a
//! [`RequestError`] with the decoded body, status and headers.
//!
//! # Example
//!
//! ```ignore
//! use flux_fetch::{AuthOptions, HyperTransport, RequestOptions, flux_request, request};
//!
//! let transport = HyperTransport::builder()
//!     .base_url("https://flux.example.com")
//!     .build()?;
//!
//! let created = request(
//!     &transport,
//!     "/users",
//!     RequestOptions::new().method("post").json(&serde_json::json!({"name": "a"}))?,
//! )
//! .await?;
//!
//! let secret = flux_request(
//!     &transport,
//!     "/secret",
//!     AuthOptions::new().flux_token(token),
//! )
//! .await?;
//! println!("{}", secret.body);
//! ```

mod body;
mod builder;
mod client;
mod config;
mod error;
mod flux;
mod headers;
mod layers;
pub mod multipart;
mod options;
mod request;
mod response;
mod tls;
mod transport;

#[cfg(test)]
mod testing;

pub use body::{FormData, FormValue, RequestBody, ResponseBody};
pub use builder::HyperTransportBuilder;
pub use client::HyperTransport;
pub use config::{
    DEFAULT_MAX_BODY_SIZE, DEFAULT_USER_AGENT, HyperTransportConfig, TlsRootConfig,
    TransportSecurity,
};
pub use error::{FetchError, InvalidUriKind, RequestError};
pub use flux::{FLUX_MARKER_HEADER, FLUX_TOKEN_HEADER, FluxClient, authenticate, flux_request};
pub use headers::{FORM_DATA_MIME, Headers, JSON_MIME};
pub use layers::{DefaultHeadersLayer, DefaultHeadersService};
pub use options::{AuthOptions, Credentials, DEFAULT_METHOD, RequestOptions};
pub use request::{DEFAULT_CONTENT_TYPE, PreparedRequest, check_status, parse_response, request};
pub use response::{BoxedBody, HyperResponse, NormalizedResponse};
pub use tls::crypto_provider;
pub use transport::{Transport, TransportRequest, TransportResponse};
