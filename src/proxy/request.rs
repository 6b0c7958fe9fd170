//! Intercepted request and response types.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use url::Url;

use crate::cache::StoredResponse;

/// Fetch request mode, as the browser reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    /// Full-page navigation; eligible for the offline root-document fallback.
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

impl RequestMode {
    /// Parse a `Sec-Fetch-Mode` header value.
    pub fn from_fetch_mode(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "navigate" => Some(RequestMode::Navigate),
            "same-origin" => Some(RequestMode::SameOrigin),
            "cors" => Some(RequestMode::Cors),
            "no-cors" => Some(RequestMode::NoCors),
            _ => None,
        }
    }
}

/// A request the proxy decides on.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub mode: RequestMode,
}

impl InterceptedRequest {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            mode,
        }
    }

    /// GET in `Cors` mode, the common shape of an application data call.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Cors)
    }

    /// GET in `Navigate` mode.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Served from the active generation without touching the network.
    Cache,
    /// Fetched from the network (and cached if successful).
    Network,
    /// Network was unreachable; the cached root document was served instead.
    Fallback,
    /// Not eligible for caching; forwarded untouched.
    Passthrough,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::Fallback => "fallback",
            ResponseSource::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub response: Arc<StoredResponse>,
    pub source: ResponseSource,
}
