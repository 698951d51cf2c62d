use crate::error::FetchError;
use http::header::{HeaderName, HeaderValue};
use http::{Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer that fills in headers the request did not set itself
#[derive(Clone, Debug)]
pub struct DefaultHeadersLayer {
    defaults: Arc<[(HeaderName, HeaderValue)]>,
}

impl DefaultHeadersLayer {
    /// Layer that adds `User-Agent` and `Accept: */*` when missing
    ///
    /// # Errors
    /// Returns `FetchError::InvalidHeaderValue` if the user agent string is not valid
    pub fn try_new(user_agent: impl AsRef<str>) -> Result<Self, FetchError> {
        let user_agent = HeaderValue::from_str(user_agent.as_ref())?;
        Ok(Self {
            defaults: Arc::from(vec![
                (http::header::USER_AGENT, user_agent),
                (http::header::ACCEPT, HeaderValue::from_static("*/*")),
            ]),
        })
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeadersService {
            inner,
            defaults: Arc::clone(&self.defaults),
        }
    }
}

/// Service that adds default headers to requests
#[derive(Clone, Debug)]
pub struct DefaultHeadersService<S> {
    inner: S,
    defaults: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for DefaultHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        for (name, value) in self.defaults.iter() {
            if !req.headers().contains_key(name) {
                req.headers_mut().insert(name.clone(), value.clone());
            }
        }
        self.inner.call(req)
    }
}
