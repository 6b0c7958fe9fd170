//! Interception proxy scenarios against a recording in-memory network.

use std::sync::Arc;

use axum::http::Method;
use url::Url;

use resilience_gateway::cache::{CacheKey, CacheStore, GenerationId, MemoryCacheStore};
use resilience_gateway::config::InterceptionConfig;
use resilience_gateway::proxy::{
    ActivationError, FetchError, InterceptedRequest, InterceptionProxy, RequestMode, ResponseSource,
};

mod common;
use common::RecordingNetwork;

const APP: &str = "http://127.0.0.1:8080";

fn app_url(path: &str) -> Url {
    Url::parse(APP).unwrap().join(path).unwrap()
}

fn proxy_over(
    network: Arc<RecordingNetwork>,
) -> (Arc<MemoryCacheStore>, InterceptionProxy<MemoryCacheStore, Arc<RecordingNetwork>>) {
    let store = Arc::new(MemoryCacheStore::new());
    let proxy = InterceptionProxy::new(store.clone(), network, &InterceptionConfig::default());
    (store, proxy)
}

fn manifest(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

#[tokio::test]
async fn miss_then_hit_touches_network_once() {
    let network = RecordingNetwork::new();
    network.route("/api/hospitals", 200, "[\"Ankara\"]");
    network.route("/", 200, "<html>");
    let (_store, proxy) = proxy_over(network.clone());
    proxy.activate(&"v1".into(), &manifest(&["/"])).await.unwrap();
    let before = network.request_count();

    let request = InterceptedRequest::get(app_url("/api/hospitals"));
    let first = proxy.handle(&request).await.unwrap();
    assert_eq!(first.source, ResponseSource::Network);
    let second = proxy.handle(&request).await.unwrap();
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(second.response.body, b"[\"Ankara\"]".to_vec());

    assert_eq!(network.request_count() - before, 1);
}

#[tokio::test]
async fn offline_navigation_serves_cached_root_document() {
    let network = RecordingNetwork::new();
    network.route("/", 200, "<html>root</html>");
    network.route("/index.html", 200, "<html>shell</html>");
    let (_store, proxy) = proxy_over(network.clone());
    proxy.activate(&"v1".into(), &manifest(&["/", "/index.html"])).await.unwrap();

    network.set_offline(true);
    let response = proxy
        .handle(&InterceptedRequest::navigate(app_url("/appointments/42")))
        .await
        .unwrap();
    assert_eq!(response.source, ResponseSource::Fallback);
    assert_eq!(response.response.body, b"<html>shell</html>".to_vec());
}

#[tokio::test]
async fn offline_data_request_surfaces_network_error() {
    let network = RecordingNetwork::new();
    network.route("/index.html", 200, "<html>shell</html>");
    let (_store, proxy) = proxy_over(network.clone());
    proxy.activate(&"v1".into(), &manifest(&["/index.html"])).await.unwrap();

    network.set_offline(true);
    let err = proxy
        .handle(&InterceptedRequest::get(app_url("/api/doctors")))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::NetworkUnreachable { .. }));
}

#[tokio::test]
async fn failed_rollover_keeps_previous_generation_serving() {
    let network = RecordingNetwork::new();
    network.route("/", 200, "g1");
    let (store, proxy) = proxy_over(network.clone());
    proxy.activate(&"g1".into(), &manifest(&["/"])).await.unwrap();

    network.route("/", 200, "g2");
    let err = proxy
        .activate(&"g2".into(), &manifest(&["/", "/missing.js"]))
        .await
        .unwrap_err();
    match err {
        ActivationError::ManifestPopulationFailed { generation, asset, .. } => {
            assert_eq!(generation, GenerationId::from("g2"));
            assert_eq!(asset, "/missing.js");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(store.active(), Some(GenerationId::from("g1")));
    assert_eq!(store.generations(), vec![GenerationId::from("g1")]);

    let served = proxy.handle(&InterceptedRequest::get(app_url("/"))).await.unwrap();
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.body, b"g1".to_vec());
}

#[tokio::test]
async fn successful_rollover_replaces_old_generation() {
    let network = RecordingNetwork::new();
    network.route("/", 200, "g1");
    let (store, proxy) = proxy_over(network.clone());
    proxy.activate(&"g1".into(), &manifest(&["/"])).await.unwrap();

    network.route("/", 200, "g2");
    network.route("/app.js", 200, "console.log(2)");
    let entries = proxy.activate(&"g2".into(), &manifest(&["/", "/app.js"])).await.unwrap();
    assert_eq!(entries, 2);

    assert_eq!(store.active(), Some(GenerationId::from("g2")));
    assert_eq!(store.generations(), vec![GenerationId::from("g2")]);
    let served = proxy.handle(&InterceptedRequest::get(app_url("/"))).await.unwrap();
    assert_eq!(served.response.body, b"g2".to_vec());
}

#[tokio::test]
async fn ineligible_requests_bypass_the_cache() {
    let network = RecordingNetwork::new();
    network.route("/", 200, "root");
    network.route("/@vite/client", 200, "hmr");
    network.route("/api/book", 200, "ok");
    network.route("/fonts/inter.woff2", 200, "font");
    let (store, proxy) = proxy_over(network.clone());
    proxy.activate(&"v1".into(), &manifest(&["/"])).await.unwrap();

    let requests = [
        InterceptedRequest::get(app_url("/@vite/client")),
        InterceptedRequest::new(Method::POST, app_url("/api/book"), RequestMode::SameOrigin).with_body("{}"),
        InterceptedRequest::get(Url::parse("https://cdn.example/fonts/inter.woff2").unwrap()),
    ];
    for request in &requests {
        for _ in 0..2 {
            let response = proxy.handle(request).await.unwrap();
            assert_eq!(response.source, ResponseSource::Passthrough, "{}", request.url);
        }
    }

    assert_eq!(store.len(&"v1".into()), 1);
    assert!(store
        .lookup(&CacheKey::for_get(&app_url("/@vite/client")))
        .is_none());
}

#[tokio::test]
async fn error_responses_are_not_cached() {
    let network = RecordingNetwork::new();
    network.route("/", 200, "root");
    network.route("/api/slots", 503, "busy");
    let (_store, proxy) = proxy_over(network.clone());
    proxy.activate(&"v1".into(), &manifest(&["/"])).await.unwrap();

    let request = InterceptedRequest::get(app_url("/api/slots"));
    for _ in 0..2 {
        let response = proxy.handle(&request).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(response.response.status, 503);
    }
    let hits = network
        .requests()
        .iter()
        .filter(|u| u.ends_with("/api/slots"))
        .count();
    assert_eq!(hits, 2);
}

#[tokio::test]
async fn snapshot_survives_restart() {
    let path = std::env::temp_dir().join(format!("resilience-snapshot-{}.json", uuid::Uuid::new_v4()));

    let network = RecordingNetwork::new();
    network.route("/index.html", 200, "<html>shell</html>");
    let (store, proxy) = proxy_over(network.clone());
    proxy.activate(&"v7".into(), &manifest(&["/index.html"])).await.unwrap();
    assert_eq!(store.save_to_file(&path).unwrap(), 1);

    let restored = Arc::new(MemoryCacheStore::load_from_file(&path).unwrap());
    let offline = RecordingNetwork::new();
    offline.set_offline(true);
    let proxy = InterceptionProxy::new(restored.clone(), offline, &InterceptionConfig::default());

    assert_eq!(restored.active(), Some(GenerationId::from("v7")));
    let response = proxy
        .handle(&InterceptedRequest::navigate(app_url("/doctors")))
        .await
        .unwrap();
    assert_eq!(response.source, ResponseSource::Fallback);

    let _ = std::fs::remove_file(&path);
}
