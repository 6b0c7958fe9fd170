//! HTTP gateway hosting the interception proxy.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy fallback and admin routes
//! - Wire up middleware (request ID, tracing, timeout)
//! - Convert each request into an `InterceptedRequest`
//! - Apply hot-reloaded configuration
//! - Persist the active cache generation on shutdown

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::admin::setup_admin_router;
use crate::cache::{GenerationId, MemoryCacheStore};
use crate::config::ResilienceConfig;
use crate::http::network::HttpNetwork;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::proxy::{InterceptedRequest, InterceptionProxy, ProxyResponse, RequestMode};

/// Header telling clients where a response came from.
pub const X_RESILIENCE_SOURCE: &str = "x-resilience-source";

pub type GatewayProxy = InterceptionProxy<MemoryCacheStore, HttpNetwork>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<GatewayProxy>,
    pub config: Arc<ArcSwap<ResilienceConfig>>,
}

/// Offline-first HTTP gateway.
pub struct GatewayServer {
    router: Router,
    state: AppState,
}

impl GatewayServer {
    /// Build the gateway around `store`. Fails only if the upstream origin
    /// does not parse, which validation already rules out.
    pub fn new(config: ResilienceConfig, store: Arc<MemoryCacheStore>) -> Result<Self, url::ParseError> {
        let network = HttpNetwork::from_config(&config.gateway)?;
        let proxy = Arc::new(InterceptionProxy::new(store, network, &config.interception));
        let state = AppState {
            proxy,
            config: Arc::new(ArcSwap::from_pointee(config)),
        };
        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let config = state.config.load_full();
        let x_request_id = HeaderName::from_static("x-request-id");

        let mut router = Router::new();
        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }
        router
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.gateway.request_timeout_secs.saturating_add(1),
                    ))),
            )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Populate and activate the configured generation.
    pub async fn activate_configured_generation(&self) {
        let config = self.state.config.load_full();
        let generation = GenerationId::from(config.cache.generation.as_str());
        match self.state.proxy.activate(&generation, &config.cache.manifest).await {
            Ok(entries) => tracing::info!(%generation, entries, "Startup activation complete"),
            Err(e) => tracing::error!(error = %e, "Startup activation failed, keeping previous generation"),
        }
    }

    /// Serve until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: &Shutdown,
        config_updates: Option<mpsc::UnboundedReceiver<ResilienceConfig>>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway starting");

        if let Some(updates) = config_updates {
            tokio::spawn(apply_config_updates(self.state.clone(), updates));
        }

        let stop = shutdown.token();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                stop.stopped().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        save_snapshot(&self.state);
        tracing::info!("Gateway stopped");
        Ok(())
    }
}

async fn apply_config_updates(state: AppState, mut updates: mpsc::UnboundedReceiver<ResilienceConfig>) {
    while let Some(new_config) = updates.recv().await {
        let current = state.config.load_full();
        if new_config.gateway != current.gateway {
            tracing::warn!("Gateway listener/upstream changes take effect after restart");
        }
        if new_config.interception != current.interception {
            state.proxy.reload_admission(&new_config.interception);
        }
        state.config.store(Arc::new(new_config));
        tracing::info!("Configuration reloaded");
    }
}

fn save_snapshot(state: &AppState) {
    let config = state.config.load();
    let Some(path) = config.cache.persistence_path.as_ref().map(PathBuf::from) else {
        return;
    };
    if let Err(e) = state.proxy.store().save_to_file(&path) {
        tracing::error!(path = %path.display(), error = %e, "Failed to save cache snapshot");
    }
}

/// Proxy handler: every non-admin request goes through the interception proxy.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let config = state.config.load_full();
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = parts.method.to_string();

    let body = match axum::body::to_bytes(body, config.gateway.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
            metrics::record_request(&method, 413, "none", start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let Some(url) = request_url(&config.interception.app_origin, &parts) else {
        metrics::record_request(&method, 400, "none", start);
        return (StatusCode::BAD_REQUEST, "Invalid request target").into_response();
    };

    let mode = request_mode(&parts.method, &parts.headers);
    tracing::debug!(request_id = %request_id, method = %parts.method, url = %url, ?mode, "Intercepting request");

    let intercepted = InterceptedRequest {
        method: parts.method,
        url,
        headers: parts.headers,
        body,
        mode,
    };

    match state.proxy.handle(&intercepted).await {
        Ok(response) => {
            metrics::record_request(&method, response.response.status, response.source.as_str(), start);
            into_http_response(response)
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "No response available");
            metrics::record_request(&method, 502, "error", start);
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

/// Absolute request URL as the browser sees it: the app origin's scheme,
/// the `Host` header (falling back to the app origin), then path and query.
pub fn request_url(app_origin: &str, parts: &Parts) -> Option<Url> {
    let origin = Url::parse(app_origin).ok()?;
    let mut url = match parts.headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => Url::parse(&format!("{}://{}", origin.scheme(), host)).ok()?,
        None => origin,
    };
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());
    Some(url)
}

/// `Sec-Fetch-Mode` when present, else GETs accepting HTML are navigations.
pub fn request_mode(method: &Method, headers: &HeaderMap) -> RequestMode {
    if let Some(mode) = headers
        .get("sec-fetch-mode")
        .and_then(|v| v.to_str().ok())
        .and_then(RequestMode::from_fetch_mode)
    {
        return mode;
    }
    let accepts_html = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"));
    if method == Method::GET && accepts_html {
        RequestMode::Navigate
    } else {
        RequestMode::SameOrigin
    }
}

fn into_http_response(proxied: ProxyResponse) -> Response {
    let stored = proxied.response;
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = Response::new(Body::from(stored.body.clone()));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in &stored.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            headers.append(name, value);
        }
    }
    headers.insert(X_RESILIENCE_SOURCE, HeaderValue::from_static(proxied.source.as_str()));
    response
}
