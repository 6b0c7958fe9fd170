//! Per-request interception and generation rollover.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::Method;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheStore, GenerationId, StoredResponse};
use crate::config::InterceptionConfig;
use crate::observability::metrics;
use crate::proxy::admission::AdmissionFilter;
use crate::proxy::error::{ActivationError, FetchError};
use crate::proxy::network::Network;
use crate::proxy::request::{InterceptedRequest, ProxyResponse, RequestMode, ResponseSource};

/// Cache-first proxy in front of a [`Network`].
pub struct InterceptionProxy<S: CacheStore, N: Network> {
    store: Arc<S>,
    network: N,
    admission: ArcSwap<AdmissionFilter>,
    /// Serializes rollovers; request handling never takes it.
    rollover: Mutex<()>,
}

impl<S: CacheStore, N: Network> InterceptionProxy<S, N> {
    pub fn new(store: Arc<S>, network: N, config: &InterceptionConfig) -> Self {
        Self {
            store,
            network,
            admission: ArcSwap::from_pointee(AdmissionFilter::from_config(config)),
            rollover: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Swap the admission rules. In-flight requests finish with the old rules.
    pub fn reload_admission(&self, config: &InterceptionConfig) {
        self.admission.store(Arc::new(AdmissionFilter::from_config(config)));
        info!(origin = %config.app_origin, denylist = config.devtool_denylist.len(), "Admission rules reloaded");
    }

    /// Decide how to answer one request.
    pub async fn handle(&self, request: &InterceptedRequest) -> Result<ProxyResponse, FetchError> {
        let admission = self.admission.load_full();

        if let Err(rejection) = admission.check(request) {
            debug!(method = %request.method, url = %request.url, ?rejection, "Passthrough");
            let response = self.fetch(request).await?;
            return Ok(ProxyResponse {
                response: Arc::new(response),
                source: ResponseSource::Passthrough,
            });
        }

        let key = CacheKey::for_get(&request.url);
        if let Some(hit) = self.store.lookup(&key) {
            metrics::record_cache_lookup(true);
            debug!(%key, "Cache hit");
            return Ok(ProxyResponse {
                response: hit,
                source: ResponseSource::Cache,
            });
        }
        metrics::record_cache_lookup(false);

        match self.fetch(request).await {
            Ok(response) => {
                let response = Arc::new(response);
                if response.is_success() {
                    match self.store.active_handle() {
                        Some(handle) => {
                            self.store.put(&handle, key.clone(), response.as_ref().clone());
                            debug!(%key, "Cached network response");
                        }
                        None => debug!(%key, "No active generation, response not cached"),
                    }
                } else {
                    debug!(%key, status = response.status, "Error status not cached");
                }
                Ok(ProxyResponse {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(err) if request.mode == RequestMode::Navigate => {
                match self.cached_fallback(&admission) {
                    Some(document) => {
                        metrics::record_fallback_served();
                        warn!(url = %request.url, error = %err, "Network unreachable, serving cached root document");
                        Ok(ProxyResponse {
                            response: document,
                            source: ResponseSource::Fallback,
                        })
                    }
                    None => {
                        warn!(url = %request.url, error = %err, "Network unreachable and no cached root document");
                        Err(err)
                    }
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Populate `generation` from `manifest` and make it active.
    ///
    /// Every path must answer 2xx. On any failure the new generation is
    /// discarded and the previous one keeps serving.
    pub async fn activate(
        &self,
        generation: &GenerationId,
        manifest: &[String],
    ) -> Result<usize, ActivationError> {
        if manifest.is_empty() {
            return Err(ActivationError::EmptyManifest(generation.clone()));
        }

        let _guard = self.rollover.lock().await;
        let admission = self.admission.load_full();
        let previous = self.store.active();
        info!(%generation, previous = ?previous.as_ref().map(|g| g.as_str()), assets = manifest.len(), "Starting rollover");

        let handle = self.store.open(generation);
        let fetches = manifest.iter().map(|asset| {
            let admission = admission.clone();
            async move {
                let url = admission.resolve(asset).ok_or_else(|| (asset.clone(), "not a valid path".to_string()))?;
                let request = InterceptedRequest::new(Method::GET, url.clone(), RequestMode::SameOrigin);
                let response = self
                    .fetch(&request)
                    .await
                    .map_err(|e| (asset.clone(), e.to_string()))?;
                if !response.is_success() {
                    return Err((asset.clone(), format!("status {}", response.status)));
                }
                Ok::<(CacheKey, StoredResponse), (String, String)>((CacheKey::for_get(&url), response))
            }
        });

        let mut populated = Vec::with_capacity(manifest.len());
        for result in join_all(fetches).await {
            match result {
                Ok(entry) => populated.push(entry),
                Err((asset, reason)) => {
                    if self.store.discard(generation) {
                        debug!(%generation, "Discarded partial generation");
                    }
                    metrics::record_rollover("failed");
                    warn!(%generation, %asset, %reason, "Rollover failed, previous generation stays active");
                    return Err(ActivationError::ManifestPopulationFailed {
                        generation: generation.clone(),
                        asset,
                        reason,
                    });
                }
            }
        }

        let count = populated.len();
        for (key, value) in populated {
            self.store.put(&handle, key, value);
        }
        self.store.activate(generation);
        let removed = self.store.delete_generations_except(generation);
        metrics::record_rollover("activated");
        info!(%generation, entries = count, removed, "Generation activated");
        Ok(count)
    }

    async fn fetch(&self, request: &InterceptedRequest) -> Result<StoredResponse, FetchError> {
        match self.network.fetch(request).await {
            Ok(response) => {
                metrics::record_network_fetch("response");
                Ok(response)
            }
            Err(err) => {
                metrics::record_network_fetch("unreachable");
                Err(err)
            }
        }
    }

    fn cached_fallback(&self, admission: &AdmissionFilter) -> Option<Arc<StoredResponse>> {
        let url = admission.fallback_url()?;
        self.store.lookup(&CacheKey::for_get(&url))
    }
}
