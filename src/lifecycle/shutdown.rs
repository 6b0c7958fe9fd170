//! Shutdown latch shared by the gateway and its background tasks.

use tokio::sync::watch;

/// One-way stop flag. Once tripped it stays tripped, so a task that starts
/// listening after the signal still sees it.
#[derive(Debug)]
pub struct Shutdown {
    tripped: watch::Sender<bool>,
}

/// A task's view of the [`Shutdown`] latch.
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tripped, _) = watch::channel(false);
        Self { tripped }
    }

    pub fn token(&self) -> StopToken {
        StopToken {
            rx: self.tripped.subscribe(),
        }
    }

    /// Trip the latch. Later calls are no-ops.
    pub fn trigger(&self) {
        let first = self.tripped.send_if_modified(|tripped| !std::mem::replace(tripped, true));
        if first {
            tracing::info!(listeners = self.tripped.receiver_count(), "Stopping");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tripped.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl StopToken {
    /// Resolves once the latch is tripped. Also resolves if the owning
    /// [`Shutdown`] was dropped.
    pub async fn stopped(mut self) {
        let _ = self.rx.wait_for(|tripped| *tripped).await;
    }
}
