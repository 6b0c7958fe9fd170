//! Request identity used as the cache key.

use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// Normalized request identity: method plus URL without fragment.
///
/// Only GET requests have a key; everything else bypasses the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    method: String,
    url: String,
}

impl CacheKey {
    /// Key for a GET of `url`.
    pub fn for_get(url: &Url) -> Self {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        Self {
            method: Method::GET.as_str().to_string(),
            url: normalized.into(),
        }
    }

    /// Key for an arbitrary request, `None` unless the method is GET.
    pub fn from_request(method: &Method, url: &Url) -> Option<Self> {
        if method == Method::GET {
            Some(Self::for_get(url))
        } else {
            None
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
