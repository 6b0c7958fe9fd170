//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Offline-first HTTP gateway.
    pub gateway: GatewayConfig,

    /// Request admission rules for the interception proxy.
    pub interception: InterceptionConfig,

    /// Cache generation and pre-population manifest.
    pub cache: CacheConfig,

    /// Reconnecting stream client.
    pub stream: StreamConfig,

    /// Query retry / poll policy.
    pub query: QueryConfig,

    pub admin: AdminConfig,

    pub observability: ObservabilityConfig,
}

/// Gateway listener and upstream.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Origin the gateway forwards to (e.g., "http://127.0.0.1:3000").
    pub upstream_origin: String,

    /// Per-request upstream timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum buffered request/response body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            upstream_origin: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Which requests are eligible for caching.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct InterceptionConfig {
    /// Origin the browser sees (the gateway's public address); only
    /// same-origin GETs are cached.
    pub app_origin: String,

    /// Path substrings of development tooling that always bypass the cache.
    pub devtool_denylist: Vec<String>,

    /// Root document served to offline navigations.
    pub fallback_document: String,
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            app_origin: "http://127.0.0.1:8080".to_string(),
            devtool_denylist: [
                "/@vite",
                "/@react-refresh",
                "/@fs/",
                "/node_modules/.vite",
                "/__vite_ping",
                ".hot-update.",
                "/sockjs-node",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fallback_document: "/index.html".to_string(),
        }
    }
}

/// Cache generation settings supplied by the deployment.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Generation id for this build.
    pub generation: String,

    /// Critical asset paths pre-populated on activation.
    pub manifest: Vec<String>,

    /// Optional JSON snapshot path, loaded at startup and saved on shutdown.
    pub persistence_path: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            generation: "v1".to_string(),
            manifest: vec!["/".to_string(), "/index.html".to_string()],
            persistence_path: None,
        }
    }
}

/// Reconnecting stream client.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// WebSocket URL (ws:// or wss://).
    pub url: String,

    /// Maximum queued outbound messages while not open; oldest dropped first.
    pub outbox_capacity: usize,

    pub reconnect: ReconnectConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000/ws".to_string(),
            outbox_capacity: 256,
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Reconnect delay strategy.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectStrategy {
    Immediate,
    Fixed,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    pub strategy: ReconnectStrategy,

    /// Fixed delay, linear step, or exponential base in milliseconds.
    pub base_delay_ms: u64,

    /// Upper bound for exponential delays.
    pub max_delay_ms: u64,

    /// Give up after this many consecutive failed attempts (unset = never).
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: ReconnectStrategy::Exponential,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
            max_attempts: None,
        }
    }
}

/// Query retry / poll policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct QueryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub refetch_on_window_focus: bool,
    pub refetch_on_reconnect: bool,
    pub poll_interval_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            refetch_on_window_focus: false,
            refetch_on_reconnect: false,
            poll_interval_ms: 30_000,
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable `/__resilience/*` admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
