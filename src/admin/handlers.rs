use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStore, GenerationId};
use crate::http::server::AppState;
use crate::proxy::ActivationError;

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationStatus {
    pub id: String,
    pub entries: usize,
    pub active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub app_origin: String,
    pub upstream_origin: String,
    pub active_generation: Option<String>,
    pub generations: Vec<GenerationStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub generation: String,
    /// Defaults to `[cache].manifest`.
    #[serde(default)]
    pub manifest: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActivateResponse {
    pub generation: String,
    pub entries: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let config = state.config.load();
    let store = state.proxy.store();
    let active = store.active();
    let generations = store
        .generations()
        .into_iter()
        .map(|id| GenerationStatus {
            entries: store.len(&id),
            active: active.as_ref() == Some(&id),
            id: id.to_string(),
        })
        .collect();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        app_origin: config.interception.app_origin.clone(),
        upstream_origin: config.gateway.upstream_origin.clone(),
        active_generation: active.map(|g| g.to_string()),
        generations,
    })
}

pub async fn activate_generation(
    State(state): State<AppState>,
    Json(request): Json<ActivateRequest>,
) -> Result<Json<ActivateResponse>, (StatusCode, Json<ErrorBody>)> {
    let manifest = match request.manifest {
        Some(manifest) => manifest,
        None => state.config.load().cache.manifest.clone(),
    };
    let generation = GenerationId::new(request.generation);

    match state.proxy.activate(&generation, &manifest).await {
        Ok(entries) => Ok(Json(ActivateResponse {
            generation: generation.to_string(),
            entries,
        })),
        Err(e) => {
            let status = match e {
                ActivationError::ManifestPopulationFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
                ActivationError::EmptyManifest(_) => StatusCode::BAD_REQUEST,
            };
            Err((status, Json(ErrorBody { error: e.to_string() })))
        }
    }
}
