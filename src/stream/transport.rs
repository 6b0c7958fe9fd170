//! Transport abstraction for the stream client.
//!
//! A resolved `open` is the open event and a failed one is the error event.
//! `recv` yields messages until the channel closes (`None`) or fails.

use std::future::Future;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Opens message channels to one remote endpoint.
pub trait Transport: Send + Sync + 'static {
    type Channel: Channel;

    fn open(&self) -> impl Future<Output = Result<Self::Channel, TransportError>> + Send;
}

/// One open, bidirectional, message-oriented connection.
pub trait Channel: Send + 'static {
    fn send(&mut self, payload: Vec<u8>) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next inbound message. `None` once the remote closed the channel.
    fn recv(&mut self) -> impl Future<Output = Option<Result<Vec<u8>, TransportError>>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}
