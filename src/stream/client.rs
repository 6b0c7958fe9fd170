//! Reconnecting message stream client.
//!
//! One driver task per client owns the underlying channel. Callers talk to
//! it through a command queue; state, the outbox and the subscriber list sit
//! behind one mutex so `send` sees state and queues atomically.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StreamConfig;
use crate::observability::metrics;
use crate::resilience::signals::{Signal, SignalSource};
use crate::stream::outbox::Outbox;
use crate::stream::policy::ReconnectPolicy;
use crate::stream::state::{ConnectionState, Trigger};
use crate::stream::transport::{Channel, Transport};

/// What subscribers observe, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A connection attempt started. `attempt` counts consecutive attempts
    /// since the last successful open, starting at 1.
    Connecting { attempt: u32 },
    Open,
    Message(Vec<u8>),
    /// The channel failed to open or was lost; a reconnect follows unless
    /// the attempt budget is spent.
    Closed { reason: String },
    /// The client stopped: explicit disconnect or attempts exhausted.
    Disconnected,
}

enum Command {
    Send(Vec<u8>),
    Online,
    Disconnect,
}

struct Shared {
    outbox: Outbox,
    commands: Option<mpsc::UnboundedSender<Command>>,
    driver: Option<JoinHandle<()>>,
    subscribers: Vec<mpsc::UnboundedSender<StreamEvent>>,
    /// Gave up after `max_attempts`; an `Online` signal restarts it.
    parked: bool,
}

impl Shared {
    fn emit(&mut self, event: StreamEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Move sends still sitting in the command queue back to the front of
    /// the outbox. `unsent` is older than anything in the queue.
    fn reclaim(&mut self, commands: &mut mpsc::UnboundedReceiver<Command>, unsent: Vec<Vec<u8>>) {
        let mut front = unsent;
        while let Ok(command) = commands.try_recv() {
            if let Command::Send(payload) = command {
                front.push(payload);
            }
        }
        for payload in front.into_iter().rev() {
            self.outbox.requeue(payload);
        }
    }
}

struct Inner<T: Transport> {
    transport: T,
    policy: ReconnectPolicy,
    shared: Mutex<Shared>,
    state: watch::Sender<ConnectionState>,
}

impl<T: Transport> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Must be called with the shared lock held.
    fn transition(&self, trigger: Trigger) -> bool {
        let current = self.current();
        match current.on(trigger) {
            Ok(next) => {
                if next != current {
                    self.state.send_replace(next);
                    metrics::record_stream_state(next.code());
                    debug!(from = %current, to = %next, ?trigger, "Stream state changed");
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "Ignoring illegal stream transition");
                false
            }
        }
    }

    fn start_driver(self: &Arc<Self>, shared: &mut Shared) {
        let (tx, rx) = mpsc::unbounded_channel();
        shared.commands = Some(tx);
        shared.parked = false;
        shared.driver = Some(tokio::spawn(drive(self.clone(), rx)));
    }

    fn deliver(&self, payload: Vec<u8>) {
        let mut shared = self.lock();
        if self.current() != ConnectionState::Open {
            debug!(bytes = payload.len(), "Dropping message received during teardown");
            return;
        }
        self.transition(Trigger::Message);
        metrics::record_stream_message("inbound");
        shared.emit(StreamEvent::Message(payload));
    }
}

/// Message stream that reconnects on its own until told to stop.
pub struct ReconnectingStream<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> ReconnectingStream<T> {
    pub fn new(transport: T, policy: ReconnectPolicy, outbox_capacity: usize) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                transport,
                policy,
                shared: Mutex::new(Shared {
                    outbox: Outbox::new(outbox_capacity),
                    commands: None,
                    driver: None,
                    subscribers: Vec::new(),
                    parked: false,
                }),
                state,
            }),
        }
    }

    pub fn from_config(transport: T, config: &StreamConfig) -> Self {
        Self::new(transport, ReconnectPolicy::from(&config.reconnect), config.outbox_capacity)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.current()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Receive every event from now on. No history is replayed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    /// Start connecting. Returns false (and does nothing) unless the client
    /// is idle in `Disconnected`.
    pub fn connect(&self) -> bool {
        let mut shared = self.inner.lock();
        if shared.commands.is_some() || self.inner.current() != ConnectionState::Disconnected {
            return false;
        }
        self.inner.start_driver(&mut shared);
        true
    }

    /// Transmit now when open, otherwise queue for the next open.
    pub fn send(&self, payload: impl Into<Vec<u8>>) {
        let payload = payload.into();
        let mut guard = self.inner.lock();
        let shared = &mut *guard;

        if self.inner.current() == ConnectionState::Open {
            if let Some(commands) = shared.commands.as_ref() {
                match commands.send(Command::Send(payload)) {
                    Ok(()) => return,
                    Err(mpsc::error::SendError(Command::Send(payload))) => {
                        shared.outbox.push(payload);
                        return;
                    }
                    Err(_) => return,
                }
            }
        }
        shared.outbox.push(payload);
    }

    /// Number of messages waiting for the next open.
    pub fn queued(&self) -> usize {
        self.inner.lock().outbox.len()
    }

    /// Tear down and stop reconnecting. Resolves once `Disconnected`.
    pub async fn disconnect(&self) {
        let driver = {
            let mut shared = self.inner.lock();
            shared.parked = false;
            let Some(commands) = shared.commands.take() else {
                return;
            };
            self.inner.transition(Trigger::Disconnect);
            let _ = commands.send(Command::Disconnect);
            shared.driver.take()
        };
        if let Some(driver) = driver {
            if let Err(e) = driver.await {
                warn!(error = %e, "Stream driver ended abnormally");
            }
        }
    }

    /// Forward `Online` signals: skip a pending reconnect delay, or restart a
    /// client that gave up. Ignored after an explicit disconnect.
    pub fn watch_connectivity(&self, source: &dyn SignalSource) -> JoinHandle<()> {
        let signals = source.subscribe();
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(forward_online(inner, signals))
    }
}

impl<T: Transport> Drop for ReconnectingStream<T> {
    fn drop(&mut self) {
        let mut shared = self.inner.lock();
        if let Some(commands) = shared.commands.take() {
            self.inner.transition(Trigger::Disconnect);
            let _ = commands.send(Command::Disconnect);
        }
    }
}

async fn forward_online<T: Transport>(inner: Weak<Inner<T>>, mut signals: broadcast::Receiver<Signal>) {
    loop {
        match signals.recv().await {
            Ok(Signal::Online) => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                let mut shared = inner.lock();
                if let Some(commands) = shared.commands.as_ref() {
                    let _ = commands.send(Command::Online);
                } else if shared.parked && inner.current() == ConnectionState::Disconnected {
                    info!("Connectivity restored, restarting stream");
                    inner.start_driver(&mut shared);
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Connectivity signals lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

enum OpenExit {
    Disconnect,
    Dropped { reason: String, unsent: Vec<Vec<u8>> },
}

async fn drive<T: Transport>(inner: Arc<Inner<T>>, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut failures: u32 = 0;

    loop {
        let attempt = failures + 1;
        let session = Uuid::new_v4();
        let closing = {
            let mut shared = inner.lock();
            let closing = inner.current() == ConnectionState::Closing;
            if !closing {
                inner.transition(Trigger::Connect);
                shared.emit(StreamEvent::Connecting { attempt });
            }
            closing
        };
        if closing {
            teardown(&inner, &mut commands, None).await;
            return;
        }
        metrics::record_stream_connect_attempt();
        info!(%session, attempt, "Connecting stream");

        let opened = {
            let open = inner.transport.open();
            tokio::pin!(open);
            loop {
                tokio::select! {
                    result = &mut open => break Some(result),
                    command = commands.recv() => match command {
                        Some(Command::Disconnect) | None => break None,
                        Some(Command::Send(payload)) => {
                            inner.lock().outbox.push(payload);
                        }
                        Some(Command::Online) => {}
                    }
                }
            }
        };

        let (reason, unsent) = match opened {
            None => {
                teardown(&inner, &mut commands, None).await;
                return;
            }
            Some(Err(e)) => {
                warn!(%session, attempt, error = %e, "Stream connect failed");
                (e.to_string(), Vec::new())
            }
            Some(Ok(mut channel)) => {
                failures = 0;
                match run_open(&inner, &mut commands, &mut channel, session).await {
                    OpenExit::Disconnect => {
                        teardown(&inner, &mut commands, Some(channel)).await;
                        return;
                    }
                    OpenExit::Dropped { reason, unsent } => {
                        warn!(%session, %reason, "Stream connection lost");
                        (reason, unsent)
                    }
                }
            }
        };

        failures += 1;
        let closing = {
            let mut shared = inner.lock();
            let closing = inner.current() == ConnectionState::Closing;
            if !closing {
                inner.transition(Trigger::Dropped);
                shared.emit(StreamEvent::Closed { reason });
            }
            shared.reclaim(&mut commands, unsent);
            closing
        };
        if closing {
            teardown(&inner, &mut commands, None).await;
            return;
        }

        let Some(delay) = inner.policy.next_delay(failures) else {
            let mut shared = inner.lock();
            shared.commands = None;
            shared.parked = true;
            shared.reclaim(&mut commands, Vec::new());
            shared.emit(StreamEvent::Disconnected);
            warn!(failures, "Reconnect attempts exhausted, stream parked");
            return;
        };

        debug!(failures, delay_ms = delay.as_millis() as u64, "Waiting before reconnect");
        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                command = commands.recv() => match command {
                    Some(Command::Disconnect) | None => {
                        teardown(&inner, &mut commands, None).await;
                        return;
                    }
                    Some(Command::Online) => {
                        info!("Connectivity restored, reconnecting now");
                        failures = 0;
                        break;
                    }
                    Some(Command::Send(payload)) => {
                        inner.lock().outbox.push(payload);
                    }
                }
            }
        }
    }
}

async fn run_open<T: Transport>(
    inner: &Inner<T>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    channel: &mut T::Channel,
    session: Uuid,
) -> OpenExit {
    let pending = {
        let mut shared = inner.lock();
        if inner.current() == ConnectionState::Closing {
            return OpenExit::Disconnect;
        }
        inner.transition(Trigger::Opened);
        shared.emit(StreamEvent::Open);
        shared.outbox.drain()
    };
    info!(%session, flushed = pending.len(), "Stream open");

    let mut pending = pending.into_iter();
    while let Some(payload) = pending.next() {
        if let Err(e) = channel.send(payload.clone()).await {
            let mut unsent = vec![payload];
            unsent.extend(pending);
            return OpenExit::Dropped { reason: e.to_string(), unsent };
        }
        metrics::record_stream_message("outbound");
    }

    loop {
        tokio::select! {
            inbound = channel.recv() => match inbound {
                Some(Ok(payload)) => inner.deliver(payload),
                Some(Err(e)) => {
                    return OpenExit::Dropped { reason: e.to_string(), unsent: Vec::new() };
                }
                None => {
                    return OpenExit::Dropped { reason: "closed by remote".to_string(), unsent: Vec::new() };
                }
            },
            command = commands.recv() => match command {
                Some(Command::Send(payload)) => {
                    if let Err(e) = channel.send(payload.clone()).await {
                        return OpenExit::Dropped { reason: e.to_string(), unsent: vec![payload] };
                    }
                    metrics::record_stream_message("outbound");
                }
                Some(Command::Online) => {}
                Some(Command::Disconnect) | None => return OpenExit::Disconnect,
            }
        }
    }
}

async fn teardown<T: Transport>(
    inner: &Inner<T>,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    channel: Option<T::Channel>,
) {
    {
        let _shared = inner.lock();
        if inner.current() != ConnectionState::Closing {
            inner.transition(Trigger::Disconnect);
        }
    }
    if let Some(mut channel) = channel {
        if let Err(e) = channel.close().await {
            debug!(error = %e, "Error closing stream channel");
        }
    }
    let mut shared = inner.lock();
    inner.transition(Trigger::TornDown);
    shared.reclaim(commands, Vec::new());
    shared.emit(StreamEvent::Disconnected);
    info!(queued = shared.outbox.len(), "Stream disconnected");
}
