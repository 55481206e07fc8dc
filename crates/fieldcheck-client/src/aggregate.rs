//! Incremental aggregation of chunk and trace messages.

use parking_lot::Mutex;

use fieldcheck_core::messages::ServerMessage;

/// Separator between trace segments.
const SEGMENT_SEPARATOR: &str = "\n\n";

#[derive(Default, Debug)]
struct AggregateState {
    partial: String,
    segments: Vec<String>,
}

/// Accumulates streaming output for one logical request.
///
/// Chunks concatenate into the partial-output buffer; trace rationales are
/// kept as ordered, append-only segments, never reordered or deduplicated.
/// Snapshots are owned copies; internal state is never handed out mutably.
#[derive(Default, Debug)]
pub struct StreamAggregator {
    state: Mutex<AggregateState>,
}

impl StreamAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one inbound message into the aggregate.
    ///
    /// Messages other than `chunk` and `trace` are ignored, as are traces
    /// without rationale text.
    pub fn apply(&self, message: &ServerMessage) {
        match message {
            ServerMessage::Chunk { content } if !content.is_empty() => {
                self.state.lock().partial.push_str(content);
            }
            ServerMessage::Trace { .. } => {
                if let Some(rationale) = message.rationale() {
                    if !rationale.is_empty() {
                        self.state.lock().segments.push(rationale.to_owned());
                    }
                }
            }
            _ => {}
        }
    }

    /// Snapshot of the concatenated chunk text.
    #[must_use]
    pub fn partial_text(&self) -> String {
        self.state.lock().partial.clone()
    }

    /// Snapshot of the trace text, segments joined by a blank line.
    #[must_use]
    pub fn trace_text(&self) -> String {
        self.state.lock().segments.join(SEGMENT_SEPARATOR)
    }

    /// Snapshot of the individual trace segments in arrival order.
    #[must_use]
    pub fn trace_segments(&self) -> Vec<String> {
        self.state.lock().segments.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
