//! Tower layers used by the hyper transport
//!
//! - [`DefaultHeadersLayer`] - Adds `User-Agent` and `Accept` when the request has none

mod default_headers;

pub use default_headers::{DefaultHeadersLayer, DefaultHeadersService};
