//! HTTP gateway subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → admin routes (/__resilience/*) or gateway_handler
//!     → InterceptedRequest (URL as the browser sees it, request mode)
//!     → InterceptionProxy
//!         → network.rs (hyper-util client → upstream origin)
//!     → response + x-resilience-source header
//! ```

pub mod network;
pub mod server;

pub use network::HttpNetwork;
pub use server::{AppState, GatewayServer, X_RESILIENCE_SOURCE};
