//! Offline-first resilience layer for a booking web client.
//!
//! Three components keep the application usable on a flaky network:
//! a versioned response cache fronted by an interception proxy, a
//! self-reconnecting message stream, and the retry/poll policy for data
//! queries. The `http` module hosts the proxy as a gateway service.

pub mod admin;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod stream;

pub use cache::{CacheStore, MemoryCacheStore};
pub use config::ResilienceConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use proxy::InterceptionProxy;
pub use resilience::QueryPolicy;
pub use stream::ReconnectingStream;
