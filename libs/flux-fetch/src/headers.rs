//! Case-insensitive header collection.

use crate::error::FetchError;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

/// MIME fragment that selects JSON encoding and parsing
pub const JSON_MIME: &str = "application/json";

/// MIME fragment that selects form-data parsing
pub const FORM_DATA_MIME: &str = "multipart/form-data";

/// Header collection with case-insensitive names.
///
/// Backed by [`http::HeaderMap`], so `Content-Type`, `content-type` and
/// `Content-type` all address the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(HeaderMap);

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self(HeaderMap::new())
    }

    /// Value of `name` as text.
    ///
    /// Returns `None` when the header is absent or its value is not visible ASCII.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw value of `name`
    #[must_use]
    pub fn get_value(&self, name: &str) -> Option<&HeaderValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Content type of the message, or the empty string when absent
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.0
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    /// Set `name` to `value`, replacing every existing value for that name.
    ///
    /// # Errors
    /// Returns `FetchError::InvalidHeaderName` or `FetchError::InvalidHeaderValue`
    /// if either part is not a valid HTTP token.
    pub fn insert(&mut self, name: &str, value: &str) -> Result<(), FetchError> {
        let name = HeaderName::try_from(name)?;
        let value = HeaderValue::try_from(value)?;
        self.0.insert(name, value);
        Ok(())
    }

    /// Set an already validated header, replacing existing values
    pub fn insert_value(&mut self, name: HeaderName, value: HeaderValue) {
        self.0.insert(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<HeaderValue> {
        self.0.remove(name)
    }

    /// Lay `other` on top of `self`: every name present in `other` replaces
    /// the entry here, names only present here are kept.
    pub fn overlay(&mut self, other: &Headers) {
        for name in other.0.keys() {
            self.0.remove(name);
            for value in other.0.get_all(name) {
                self.0.append(name.clone(), value.clone());
            }
        }
    }

    /// Iterate over `(name, value)` pairs; names are lowercase
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_header_map(&self) -> &HeaderMap {
        &self.0
    }

    #[must_use]
    pub fn into_header_map(self) -> HeaderMap {
        self.0
    }

    /// Build from string pairs; later pairs replace earlier ones with the same name.
    ///
    /// # Errors
    /// Returns the first invalid header name or value encountered.
    pub fn try_from_pairs<I, K, V>(pairs: I) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut headers = Self::new();
        for (name, value) in pairs {
            headers.insert(name.as_ref(), value.as_ref())?;
        }
        Ok(headers)
    }
}

impl From<HeaderMap> for Headers {
    fn from(map: HeaderMap) -> Self {
        Self(map)
    }
}

/// Case-insensitive substring match used for content-type sniffing.
///
/// `fragment` must already be lowercase.
pub(crate) fn mime_contains(content_type: &[u8], fragment: &str) -> bool {
    let fragment = fragment.as_bytes();
    if fragment.is_empty() {
        return true;
    }
    content_type
        .windows(fragment.len())
        .any(|window| window.eq_ignore_ascii_case(fragment))
}
