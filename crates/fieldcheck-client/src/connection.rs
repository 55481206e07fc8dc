//! Connection lifecycle management with passive reconnection.
//!
//! The [`ConnectionManager`] owns the single live channel. Inbound frames
//! are handed to the message dispatcher; lifecycle transitions are broadcast
//! to watchers. After an unexpected closure the manager schedules reconnect
//! attempts on an exponential backoff schedule until the policy budget is
//! spent; exhaustion is reported through the lifecycle stream and surfaced
//! as an error the next time a caller tries to send.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use fieldcheck_core::backoff::ReconnectPolicy;
use fieldcheck_core::ids::ConnectionId;

use crate::dispatch::MessageDispatcher;
use crate::transport::{ChannelEvent, ChannelHandle, Connector, TransportError};

/// Capacity of the lifecycle broadcast channel.
const LIFECYCLE_CAPACITY: usize = 32;

/// Connection lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live channel.
    Disconnected,
    /// A dial is in flight.
    Connecting,
    /// The channel is ready to send.
    Connected,
}

/// Lifecycle transition broadcast to watchers.
#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    /// The channel reached the connected state.
    Connected,
    /// The channel closed.
    Closed,
    /// The channel reported an error.
    Error(String),
    /// A reconnect attempt was scheduled.
    ReconnectScheduled {
        /// 1-based attempt number.
        attempt: u32,
        /// Delay before the attempt fires.
        delay: Duration,
    },
    /// The reconnect budget is spent; no further attempts will be scheduled.
    ReconnectsExhausted,
}

/// Connection-level failure.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The channel failed before reaching the connected state.
    #[error("connect failed: {0}")]
    Connect(#[from] TransportError),

    /// An operation that requires a live channel ran without one.
    #[error("channel is not connected")]
    NotConnected,

    /// Passive reconnection gave up after the configured attempt budget.
    #[error("reconnect attempts exhausted after {0} failures")]
    Exhausted(u32),
}

struct Inner {
    state: ConnectionState,
    outbound: Option<mpsc::Sender<String>>,
    reader_task: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    reconnect_attempts: u32,
    exhausted: bool,
    /// Bumped whenever the live channel is replaced or torn down; exit
    /// paths of older reader tasks compare against it and stand down.
    epoch: u64,
}

/// Owns the duplex channel and its reconnection loop.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    dispatcher: Arc<MessageDispatcher>,
    lifecycle: broadcast::Sender<ConnectionEvent>,
    inner: Mutex<Inner>,
}

impl ConnectionManager {
    /// Create a manager; nothing is dialed until [`connect`].
    ///
    /// [`connect`]: ConnectionManager::connect
    pub fn new(
        connector: Arc<dyn Connector>,
        dispatcher: Arc<MessageDispatcher>,
        policy: ReconnectPolicy,
    ) -> Arc<Self> {
        let (lifecycle, _) = broadcast::channel(LIFECYCLE_CAPACITY);
        Arc::new(Self {
            connector,
            policy,
            dispatcher,
            lifecycle,
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                outbound: None,
                reader_task: None,
                reconnect_timer: None,
                reconnect_attempts: 0,
                exhausted: false,
                epoch: 0,
            }),
        })
    }

    /// Subscribe to lifecycle transitions.
    pub fn watch(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.lifecycle.subscribe()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Whether the channel is ready to send.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Ensure a live channel, dialing if necessary.
    ///
    /// Idempotent while connected. A manual call cancels any pending
    /// passive reconnect timer; a successful connection resets the attempt
    /// counter and the exhaustion state.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ConnectionError> {
        {
            let mut inner = self.inner.lock();
            if inner.state == ConnectionState::Connected {
                return Ok(());
            }
            if let Some(timer) = inner.reconnect_timer.take() {
                timer.abort();
            }
            inner.state = ConnectionState::Connecting;
        }

        let handle = match self.connector.connect().await {
            Ok(handle) => handle,
            Err(e) => {
                self.inner.lock().state = ConnectionState::Disconnected;
                return Err(ConnectionError::Connect(e));
            }
        };

        self.install_channel(handle);
        let _ = self.lifecycle.send(ConnectionEvent::Connected);
        Ok(())
    }

    /// Send a text frame over the live channel.
    pub async fn send(&self, text: String) -> Result<(), ConnectionError> {
        let (sender, exhausted) = {
            let inner = self.inner.lock();
            let sender = if inner.state == ConnectionState::Connected {
                inner.outbound.clone()
            } else {
                None
            };
            (sender, inner.exhausted)
        };

        match sender {
            Some(tx) => tx.send(text).await.map_err(|_| ConnectionError::NotConnected),
            None if exhausted => Err(ConnectionError::Exhausted(self.policy.max_attempts)),
            None => Err(ConnectionError::NotConnected),
        }
    }

    /// Tear down the channel and cancel any pending reconnect.
    ///
    /// Does not schedule reconnection; the next [`connect`] starts fresh.
    ///
    /// [`connect`]: ConnectionManager::connect
    pub fn disconnect(&self) {
        let was_connected = {
            let mut inner = self.inner.lock();
            if let Some(timer) = inner.reconnect_timer.take() {
                timer.abort();
            }
            if let Some(reader) = inner.reader_task.take() {
                reader.abort();
            }
            let was_connected = inner.state == ConnectionState::Connected;
            // Dropping the sender lets the write task close the channel.
            inner.outbound = None;
            inner.state = ConnectionState::Disconnected;
            inner.reconnect_attempts = 0;
            inner.exhausted = false;
            inner.epoch += 1;
            was_connected
        };

        if was_connected {
            debug!("channel disconnected");
            let _ = self.lifecycle.send(ConnectionEvent::Closed);
        }
    }

    /// Take ownership of a freshly dialed channel, replacing any previous
    /// one, and spawn its reader task.
    fn install_channel(self: &Arc<Self>, handle: ChannelHandle) {
        let ChannelHandle {
            outbound,
            mut events,
        } = handle;

        let connection_id = ConnectionId::new();
        debug!(connection_id = %connection_id, "channel installed");

        let mut inner = self.inner.lock();
        if let Some(old) = inner.reader_task.take() {
            old.abort();
        }
        inner.outbound = Some(outbound);
        inner.state = ConnectionState::Connected;
        inner.reconnect_attempts = 0;
        inner.exhausted = false;
        inner.epoch += 1;
        let epoch = inner.epoch;

        let mgr = Arc::clone(self);
        inner.reader_task = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ChannelEvent::Message(raw) => mgr.dispatcher.dispatch_raw(&raw),
                    ChannelEvent::Error(e) => {
                        warn!(error = %e, "channel error");
                        let _ = mgr.lifecycle.send(ConnectionEvent::Error(e));
                    }
                    ChannelEvent::Closed => break,
                }
            }
            mgr.handle_closed(epoch);
        }));
    }

    /// Reader-task exit path: emit `Closed` and start the passive
    /// reconnect loop, unless this channel was already replaced or torn
    /// down deliberately.
    fn handle_closed(self: &Arc<Self>, epoch: u64) {
        {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return;
            }
            inner.state = ConnectionState::Disconnected;
            inner.outbound = None;
            inner.reader_task = None;
        }

        debug!("channel closed unexpectedly");
        let _ = self.lifecycle.send(ConnectionEvent::Closed);
        self.schedule_reconnect();
    }

    /// Schedule the next reconnect attempt, or report exhaustion once the
    /// policy budget is spent. Only one timer is ever pending.
    fn schedule_reconnect(self: &Arc<Self>) {
        let (attempt, delay) = {
            let mut inner = self.inner.lock();
            inner.reconnect_attempts += 1;
            let attempt = inner.reconnect_attempts;

            let Some(delay) = self.policy.delay_for_attempt(attempt) else {
                inner.exhausted = true;
                drop(inner);
                warn!(
                    attempts = self.policy.max_attempts,
                    "reconnect attempts exhausted"
                );
                let _ = self.lifecycle.send(ConnectionEvent::ReconnectsExhausted);
                return;
            };

            if let Some(prev) = inner.reconnect_timer.take() {
                prev.abort();
            }

            let mgr = Arc::clone(self);
            inner.reconnect_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // This timer has fired; clear the slot so a concurrent
                // connect() cannot abort a task that is already running.
                let _ = mgr.inner.lock().reconnect_timer.take();
                if mgr.connect().await.is_err() {
                    mgr.schedule_reconnect();
                }
            }));
            (attempt, delay)
        };

        debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        let _ = self
            .lifecycle
            .send(ConnectionEvent::ReconnectScheduled { attempt, delay });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
