//! Client facade: submit a safety check and await its single outcome.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, oneshot};
use tracing::debug;

use fieldcheck_auth::TokenProvider;
use fieldcheck_core::ids::SessionId;
use fieldcheck_core::messages::{SafetyCheckRequest, WorkOrderDetails};

use crate::aggregate::StreamAggregator;
use crate::config::ClientConfig;
use crate::connection::{ConnectionEvent, ConnectionManager};
use crate::dispatch::MessageDispatcher;
use crate::errors::CheckError;
use crate::guard::{CheckResult, CompletionGuard};
use crate::transport::Connector;

/// Duplex-streaming safety-check client.
///
/// One client owns one channel; logical requests share it. The connection
/// is established on first use, reused afterwards, and passively
/// reconnected after unexpected closures.
pub struct SafetyCheckClient {
    manager: Arc<ConnectionManager>,
    dispatcher: Arc<MessageDispatcher>,
    tokens: Arc<dyn TokenProvider>,
    config: ClientConfig,
}

impl SafetyCheckClient {
    /// Build a client from a connector, token provider, and configuration.
    pub fn new(
        connector: Arc<dyn Connector>,
        tokens: Arc<dyn TokenProvider>,
        config: ClientConfig,
    ) -> Self {
        let dispatcher = Arc::new(MessageDispatcher::new());
        let manager =
            ConnectionManager::new(connector, Arc::clone(&dispatcher), config.reconnect.clone());
        Self {
            manager,
            dispatcher,
            tokens,
            config,
        }
    }

    /// Subscribe to connection lifecycle transitions.
    pub fn watch_connection(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.manager.watch()
    }

    /// Whether the underlying channel is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    /// Ensure the channel is connected without submitting anything.
    pub async fn connect(&self) -> Result<(), CheckError> {
        Ok(self.manager.connect().await?)
    }

    /// Tear down the channel and cancel passive reconnection.
    ///
    /// Pending requests are not failed; their deadlines still bound them.
    pub fn disconnect(&self) {
        self.manager.disconnect();
    }

    /// Submit one safety check for the given work order.
    ///
    /// Ensures a live channel, fetches a fresh token, sends the request
    /// under a newly generated session id, and arms the completion deadline
    /// once the send is handed off. The returned handle resolves with
    /// exactly one outcome.
    pub async fn submit(
        &self,
        details: WorkOrderDetails,
    ) -> Result<PendingSafetyCheck, CheckError> {
        self.manager.connect().await?;

        // A fresh token per send; never cached here.
        let token = self.tokens.fetch_token().await?;

        let request = SafetyCheckRequest::new(token.into_inner(), details);
        let session_id = request.session_id.clone();
        let frame = request.to_json()?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let guard = Arc::new(CompletionGuard::new(outcome_tx));
        let aggregator = Arc::new(StreamAggregator::new());

        // The aggregator and the guard each consume the inbound stream.
        let agg = Arc::clone(&aggregator);
        let aggregator_handler = self.dispatcher.add_handler(Arc::new(move |msg| agg.apply(msg)));
        let g = Arc::clone(&guard);
        let guard_handler = self.dispatcher.add_handler(Arc::new(move |msg| g.observe(msg)));

        let dispatcher = Arc::clone(&self.dispatcher);
        guard.on_complete(move || {
            let _ = dispatcher.remove_handler(aggregator_handler);
            let _ = dispatcher.remove_handler(guard_handler);
        });

        if let Err(e) = self.manager.send(frame).await {
            // Detach before surfacing; the request never went out.
            guard.cancel();
            return Err(e.into());
        }

        // The deadline starts only once the request is on its way, so
        // connection setup does not consume the completion budget.
        guard.arm_deadline(self.config.deadline());

        debug!(session_id = %session_id, "safety check submitted");

        Ok(PendingSafetyCheck {
            session_id,
            submitted_at: Instant::now(),
            aggregator,
            guard,
            outcome: Some(outcome_rx),
        })
    }
}

/// Handle to one in-flight safety check.
///
/// Dropping the handle cancels the request: its handlers detach from the
/// dispatcher and the deadline timer is cleared. The shared channel stays
/// open for other requests.
#[derive(Debug)]
pub struct PendingSafetyCheck {
    session_id: SessionId,
    submitted_at: Instant,
    aggregator: Arc<StreamAggregator>,
    guard: Arc<CompletionGuard>,
    outcome: Option<oneshot::Receiver<CheckResult>>,
}

impl PendingSafetyCheck {
    /// The session id this request was submitted under.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// When the request was submitted.
    #[must_use]
    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Snapshot of the aggregated reasoning trace.
    #[must_use]
    pub fn trace_text(&self) -> String {
        self.aggregator.trace_text()
    }

    /// Snapshot of the partial streamed output.
    #[must_use]
    pub fn partial_text(&self) -> String {
        self.aggregator.partial_text()
    }

    /// Whether a terminal outcome has been produced.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.guard.is_completed()
    }

    /// Wait for the single terminal outcome.
    pub async fn wait(mut self) -> CheckResult {
        let Some(rx) = self.outcome.take() else {
            return Err(CheckError::Cancelled);
        };
        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(CheckError::Cancelled),
        }
    }

    /// Cancel the request: detach handlers and clear the deadline timer.
    ///
    /// Does not close the shared channel; other logical requests may still
    /// be using it.
    pub fn cancel(&self) {
        self.guard.cancel();
    }
}

impl Drop for PendingSafetyCheck {
    fn drop(&mut self) {
        // No-op when already completed.
        self.guard.cancel();
    }
}
