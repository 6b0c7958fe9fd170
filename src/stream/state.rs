//! Connection lifecycle state machine.

use std::fmt;

use thiserror::Error;

/// Lifecycle of a [`ReconnectingStream`](crate::stream::ReconnectingStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// Explicit teardown in progress.
    Closing,
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A connection attempt starts.
    Connect,
    /// The underlying channel reported open.
    Opened,
    /// A message arrived.
    Message,
    /// The underlying channel closed or errored.
    Dropped,
    /// The caller asked to disconnect.
    Disconnect,
    /// Teardown finished.
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal transition: {trigger:?} while {from}")]
pub struct IllegalTransition {
    pub from: ConnectionState,
    pub trigger: Trigger,
}

impl ConnectionState {
    /// Apply `trigger`, returning the next state.
    pub fn on(self, trigger: Trigger) -> Result<ConnectionState, IllegalTransition> {
        use ConnectionState::*;
        use Trigger::*;

        match (self, trigger) {
            (Disconnected, Connect) => Ok(Connecting),
            (Connecting, Opened) => Ok(Open),
            (Open, Message) => Ok(Open),
            (Connecting | Open, Dropped) => Ok(Disconnected),
            (Disconnected | Connecting | Open, Disconnect) => Ok(Closing),
            (Closing, TornDown) => Ok(Disconnected),
            (from, trigger) => Err(IllegalTransition { from, trigger }),
        }
    }

    /// Numeric code exported as the `resilience_stream_state` gauge.
    pub fn code(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Closing => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
        };
        f.write_str(name)
    }
}
