//! Exactly-once completion for a pending safety check.
//!
//! A [`CompletionGuard`] starts armed. The first of a terminal message, a
//! deadline expiry, or a cancellation takes the armed state out of the
//! guard — atomically with respect to message dispatch — aborts the
//! deadline timer, runs the registered detach closures, and resolves the
//! caller's oneshot. Everything after that is a no-op.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use fieldcheck_core::messages::{SafetyReport, ServerMessage};
use fieldcheck_core::sanitize::sanitize;

use crate::errors::CheckError;

/// Fallback text when the server reports an error without a message.
const GENERIC_SERVER_ERROR: &str = "Unknown error";

/// Outcome resolved for a pending safety check.
pub type CheckResult = Result<SafetyReport, CheckError>;

struct Armed {
    outcome_tx: oneshot::Sender<CheckResult>,
    deadline_timer: Option<JoinHandle<()>>,
    detach: Vec<Box<dyn FnOnce() + Send>>,
}

/// Enforces exactly one terminal outcome per pending request.
pub struct CompletionGuard {
    armed: Mutex<Option<Armed>>,
}

impl std::fmt::Debug for CompletionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGuard")
            .field("armed", &self.armed.lock().is_some())
            .finish()
    }
}

impl CompletionGuard {
    /// Create an armed guard resolving `outcome_tx` exactly once.
    #[must_use]
    pub fn new(outcome_tx: oneshot::Sender<CheckResult>) -> Self {
        Self {
            armed: Mutex::new(Some(Armed {
                outcome_tx,
                deadline_timer: None,
                detach: Vec::new(),
            })),
        }
    }

    /// Register cleanup to run on completion (handler detach and the like).
    ///
    /// Runs immediately if the guard has already completed.
    pub fn on_complete(&self, f: impl FnOnce() + Send + 'static) {
        let run_now: Box<dyn FnOnce() + Send> = {
            let mut armed = self.armed.lock();
            match armed.as_mut() {
                Some(state) => {
                    state.detach.push(Box::new(f));
                    return;
                }
                None => Box::new(f),
            }
        };
        run_now();
    }

    /// Start the deadline timer.
    ///
    /// Must be called only after the outbound send has been handed off, so
    /// connection setup does not consume the completion budget. Replaces a
    /// previously armed timer; no-op if the guard has already completed.
    pub fn arm_deadline(self: &Arc<Self>, deadline: Duration) {
        let guard = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            debug!(deadline_ms = deadline.as_millis() as u64, "completion deadline expired");
            guard.complete(Err(CheckError::Timeout));
        });

        let mut armed = self.armed.lock();
        match armed.as_mut() {
            Some(state) => {
                if let Some(prev) = state.deadline_timer.replace(timer) {
                    prev.abort();
                }
            }
            None => timer.abort(),
        }
    }

    /// Whether a terminal outcome has already been produced.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.armed.lock().is_none()
    }

    /// Observe an inbound message, completing on a terminal one.
    ///
    /// `final` with empty text resolves as [`CheckError::EmptyResponse`];
    /// otherwise the raw text passes through the sanitizer. `error` resolves
    /// with the server-supplied text or a generic message. Anything else,
    /// and anything after completion, is ignored.
    pub fn observe(&self, message: &ServerMessage) {
        match message {
            ServerMessage::Final {
                response,
                performed_at,
            } => {
                if response.is_empty() {
                    self.complete(Err(CheckError::EmptyResponse));
                } else {
                    self.complete(Ok(SafetyReport {
                        text: sanitize(response),
                        performed_at: performed_at.clone(),
                    }));
                }
            }
            ServerMessage::Error { message } => {
                let text = message
                    .clone()
                    .unwrap_or_else(|| GENERIC_SERVER_ERROR.to_owned());
                self.complete(Err(CheckError::Server(text)));
            }
            _ => {}
        }
    }

    /// Resolve the pending request; the first caller wins, the rest no-op.
    pub fn complete(&self, outcome: CheckResult) {
        let Some(armed) = self.armed.lock().take() else {
            return;
        };
        let Armed {
            outcome_tx,
            deadline_timer,
            detach,
        } = armed;

        if let Some(timer) = deadline_timer {
            timer.abort();
        }
        for f in detach {
            f();
        }
        // The receiver may have been dropped by a caller that went away.
        let _ = outcome_tx.send(outcome);
    }

    /// Cancel without a server outcome: detach handlers, clear the timer.
    pub fn cancel(&self) {
        self.complete(Err(CheckError::Cancelled));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
