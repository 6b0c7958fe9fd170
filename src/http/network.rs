//! Upstream [`Network`] over the hyper-util client.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderName, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::cache::StoredResponse;
use crate::config::GatewayConfig;
use crate::proxy::{FetchError, InterceptedRequest, Network};

const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::HOST,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
    header::UPGRADE,
    header::TE,
];

/// Forwards intercepted requests to the upstream origin.
///
/// Only scheme, host and port are rewritten; path and query are kept.
#[derive(Clone)]
pub struct HttpNetwork {
    client: Client<HttpConnector, Body>,
    upstream: Url,
    timeout: Duration,
    max_body_bytes: usize,
}

impl HttpNetwork {
    pub fn new(upstream: Url, timeout: Duration, max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            upstream,
            timeout,
            max_body_bytes,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, url::ParseError> {
        Ok(Self::new(
            Url::parse(&config.upstream_origin)?,
            Duration::from_secs(config.request_timeout_secs),
            config.max_body_bytes,
        ))
    }

    fn upstream_url(&self, url: &Url) -> Url {
        let mut target = self.upstream.clone();
        target.set_path(url.path());
        target.set_query(url.query());
        target
    }

    async fn forward(&self, request: &InterceptedRequest, target: &Url) -> Result<StoredResponse, String> {
        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(target.as_str());
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in request.headers.iter() {
                if !HOP_BY_HOP.contains(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        let upstream_request = builder
            .body(Body::from(request.body.clone()))
            .map_err(|e| e.to_string())?;

        let response: hyper::Response<hyper::body::Incoming> = self
            .client
            .request(upstream_request)
            .await
            .map_err(|e| e.to_string())?;

        let (parts, body) = response.into_parts();
        // The upstream answered; a body we cannot read is a bad gateway, not an outage.
        let body = match axum::body::to_bytes(Body::new(body), self.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    url = %target,
                    status = parts.status.as_u16(),
                    limit = self.max_body_bytes,
                    error = %e,
                    "Upstream body rejected"
                );
                return Ok(StoredResponse::new(
                    StatusCode::BAD_GATEWAY.as_u16(),
                    format!("upstream body rejected: {e}"),
                )
                .with_header("content-type", "text/plain"));
            }
        };

        let mut stored = StoredResponse::new(parts.status.as_u16(), body.to_vec());
        for (name, value) in parts.headers.iter() {
            if HOP_BY_HOP.contains(name) {
                continue;
            }
            if let Ok(value) = value.to_str() {
                stored = stored.with_header(name.as_str(), value);
            }
        }
        Ok(stored)
    }
}

impl Network for HttpNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError> {
        let target = self.upstream_url(&request.url);
        match tokio::time::timeout(self.timeout, self.forward(request, &target)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(reason)) => {
                tracing::warn!(url = %target, %reason, "Upstream unreachable");
                Err(FetchError::unreachable(target.as_str(), reason))
            }
            Err(_) => {
                tracing::warn!(url = %target, timeout_secs = self.timeout.as_secs(), "Upstream timed out");
                Err(FetchError::unreachable(
                    target.as_str(),
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        }
    }
}
