//! Cache admission filter.
//!
//! Only same-origin GET requests outside development tooling paths may be
//! cached. Everything else goes straight to the network.

use url::{Origin, Url};

use axum::http::Method;

use crate::config::InterceptionConfig;
use crate::proxy::request::InterceptedRequest;

/// Why a request was not admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotGet,
    CrossOrigin,
    DevTooling(String),
}

#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    app_origin: Origin,
    denylist: Vec<String>,
    fallback_document: String,
}

impl AdmissionFilter {
    /// Build from config. An unparseable origin admits nothing (every request
    /// is treated as cross-origin); validation rejects such configs earlier.
    pub fn from_config(config: &InterceptionConfig) -> Self {
        let app_origin = Url::parse(&config.app_origin)
            .map(|u| u.origin())
            .unwrap_or_else(|e| {
                tracing::warn!(origin = %config.app_origin, error = %e, "Invalid app origin, caching disabled");
                Origin::new_opaque()
            });
        Self {
            app_origin,
            denylist: config.devtool_denylist.clone(),
            fallback_document: config.fallback_document.clone(),
        }
    }

    pub fn check(&self, request: &InterceptedRequest) -> Result<(), Rejection> {
        if request.method != Method::GET {
            return Err(Rejection::NotGet);
        }
        if request.url.origin() != self.app_origin {
            return Err(Rejection::CrossOrigin);
        }
        let path = request.url.path();
        if let Some(pattern) = self.denylist.iter().find(|p| path.contains(p.as_str())) {
            return Err(Rejection::DevTooling(pattern.clone()));
        }
        Ok(())
    }

    pub fn is_eligible(&self, request: &InterceptedRequest) -> bool {
        self.check(request).is_ok()
    }

    /// Resolve an absolute path against the application origin.
    pub fn resolve(&self, path: &str) -> Option<Url> {
        Url::parse(&self.app_origin.ascii_serialization())
            .ok()?
            .join(path)
            .ok()
    }

    /// Absolute URL of the offline root document, if the origin is usable.
    pub fn fallback_url(&self) -> Option<Url> {
        self.resolve(&self.fallback_document)
    }
}
