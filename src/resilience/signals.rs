//! Injected connectivity and focus signals.
//!
//! Components never read ambient "online" or "focused" state. They subscribe
//! to a [`SignalSource`], which tests drive directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Online,
    Offline,
    WindowFocus,
}

/// Anything that can hand out a stream of [`Signal`]s.
pub trait SignalSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<Signal>;
}

/// Broadcast-backed signal source.
#[derive(Debug, Clone)]
pub struct ConnectivitySignals {
    tx: broadcast::Sender<Signal>,
    online: Arc<AtomicBool>,
}

impl ConnectivitySignals {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            tx,
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Publish `signal` to all current subscribers.
    pub fn emit(&self, signal: Signal) {
        match signal {
            Signal::Online => self.online.store(true, Ordering::SeqCst),
            Signal::Offline => self.online.store(false, Ordering::SeqCst),
            Signal::WindowFocus => {}
        }
        tracing::debug!(?signal, "Connectivity signal");
        let _ = self.tx.send(signal);
    }

    /// Last known connectivity.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

impl Default for ConnectivitySignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for ConnectivitySignals {
    fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.tx.subscribe()
    }
}
