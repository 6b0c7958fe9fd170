//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics and reports every
//! problem at once rather than stopping at the first.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ResilienceConfig;

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Validate `config`, returning all errors found.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.gateway.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("gateway.bind_address", "not a socket address"));
    }
    check_origin(&mut errors, "gateway.upstream_origin", &config.gateway.upstream_origin);
    if config.gateway.request_timeout_secs == 0 {
        errors.push(ValidationError::new("gateway.request_timeout_secs", "must be > 0"));
    }
    if config.gateway.max_body_bytes == 0 {
        errors.push(ValidationError::new("gateway.max_body_bytes", "must be > 0"));
    }

    check_origin(&mut errors, "interception.app_origin", &config.interception.app_origin);
    if !config.interception.fallback_document.starts_with('/') {
        errors.push(ValidationError::new("interception.fallback_document", "must start with '/'"));
    }
    if config.interception.devtool_denylist.iter().any(|s| s.is_empty()) {
        errors.push(ValidationError::new(
            "interception.devtool_denylist",
            "empty pattern would match every path",
        ));
    }

    if config.cache.generation.trim().is_empty() {
        errors.push(ValidationError::new("cache.generation", "must not be empty"));
    }
    for path in &config.cache.manifest {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                "cache.manifest",
                format!("'{}' must start with '/'", path),
            ));
        }
    }

    match Url::parse(&config.stream.url) {
        Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
        _ => errors.push(ValidationError::new("stream.url", "must be a ws:// or wss:// URL")),
    }
    if config.stream.outbox_capacity == 0 {
        errors.push(ValidationError::new("stream.outbox_capacity", "must be > 0"));
    }
    let reconnect = &config.stream.reconnect;
    if reconnect.base_delay_ms > reconnect.max_delay_ms {
        errors.push(ValidationError::new(
            "stream.reconnect.base_delay_ms",
            "must not exceed max_delay_ms",
        ));
    }
    if reconnect.max_attempts == Some(0) {
        errors.push(ValidationError::new("stream.reconnect.max_attempts", "must be >= 1 when set"));
    }

    if config.query.base_delay_ms > config.query.max_delay_ms {
        errors.push(ValidationError::new("query.base_delay_ms", "must not exceed max_delay_ms"));
    }
    if config.query.poll_interval_ms == 0 {
        errors.push(ValidationError::new("query.poll_interval_ms", "must be > 0"));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "required when admin is enabled"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_origin(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match Url::parse(value) {
        Ok(url) if (url.scheme() == "http" || url.scheme() == "https") && url.path() == "/" => {}
        Ok(_) => errors.push(ValidationError::new(field, "must be an http(s) origin without a path")),
        Err(e) => errors.push(ValidationError::new(field, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&ResilienceConfig::default()), Ok(()));
    }

    #[test]
    fn reports_every_error() {
        let mut config = ResilienceConfig::default();
        config.interception.app_origin = "not a url".into();
        config.interception.fallback_document = "index.html".into();
        config.cache.manifest.push("assets/app.js".into());
        config.stream.url = "http://example.com".into();
        config.stream.reconnect.max_attempts = Some(0);

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "interception.app_origin",
                "interception.fallback_document",
                "cache.manifest",
                "stream.url",
                "stream.reconnect.max_attempts",
            ]
        );
    }

    #[test]
    fn origin_with_path_is_rejected() {
        let mut config = ResilienceConfig::default();
        config.gateway.upstream_origin = "http://127.0.0.1:3000/app".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "gateway.upstream_origin");
    }

    #[test]
    fn error_display() {
        let err = ValidationError::new("query.poll_interval_ms", "must be > 0");
        assert_eq!(err.to_string(), "query.poll_interval_ms: must be > 0");
    }
}
