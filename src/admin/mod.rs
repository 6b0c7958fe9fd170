//! Authenticated admin routes for rollover and status.
//!
//! # Data Flow
//! ```text
//! POST /__resilience/activate {generation, manifest?}
//!     → auth.rs (Bearer api key)
//!     → handlers.rs → InterceptionProxy::activate
//!     → 200 {generation, entries} | 503 {error} | 400 {error}
//!
//! GET /__resilience/status
//!     → auth.rs → handlers.rs → active generation + per-generation counts
//! ```

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub const ACTIVATE_PATH: &str = "/__resilience/activate";
pub const STATUS_PATH: &str = "/__resilience/status";

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(STATUS_PATH, get(get_status))
        .route(ACTIVATE_PATH, post(activate_generation))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
