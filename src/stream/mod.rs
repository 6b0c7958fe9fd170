//! Reconnecting message stream client.
//!
//! # Data Flow
//! ```text
//! connect()
//!     → driver task: Disconnected → Connecting → Transport::open
//!         ok    → Open → flush outbox (FIFO) → relay messages to subscribers
//!         error → Disconnected → ReconnectPolicy delay → Connecting ...
//! send()       → Open: command queue → channel
//!              → otherwise: outbox (bounded, oldest dropped)
//! disconnect() → Closing → channel closed → Disconnected (no reconnect)
//! ```
//!
//! # Design Decisions
//! - A single driver task owns the channel, so at most one connection
//!   attempt is ever in flight
//! - Subscribers are unbounded channels notified in subscription order
//! - The transport is a trait so tests script connection failures

pub mod client;
pub mod outbox;
pub mod policy;
pub mod state;
pub mod transport;
pub mod websocket;

pub use client::{ReconnectingStream, StreamEvent};
pub use outbox::Outbox;
pub use policy::{Backoff, ReconnectPolicy};
pub use state::{ConnectionState, IllegalTransition, Trigger};
pub use transport::{Channel, Transport, TransportError};
pub use websocket::WebSocketTransport;
