//! Wire messages for the safety-check streaming protocol.
//!
//! Payloads are JSON text frames. Inbound frames may arrive flat or wrapped
//! one level deep in a `message` envelope carrying the same fields;
//! [`ServerMessage::parse`] accepts both shapes, with the nested level taking
//! precedence for interpretation and the outer level serving as a fallback
//! for the final-response payload fields.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ids::{SessionId, WorkOrderId};

// ─────────────────────────────────────────────────────────────────────────────
// Outbound
// ─────────────────────────────────────────────────────────────────────────────

/// Work order fields forwarded to the safety-check agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderDetails {
    /// Work order identifier.
    pub work_order_id: WorkOrderId,
    /// Site latitude.
    pub latitude: f64,
    /// Site longitude.
    pub longitude: f64,
    /// Scheduled start of the work, as supplied by the work-order system.
    pub target_datetime: String,
}

/// The single stateful request opening a safety-check exchange.
#[derive(Clone, Debug, Serialize)]
pub struct SafetyCheckRequest {
    /// Action discriminator; always [`SafetyCheckRequest::ACTION`].
    pub action: String,
    /// Bearer token, fetched fresh for every send.
    pub token: String,
    /// Work order the check is about.
    #[serde(rename = "workOrderDetails")]
    pub work_order_details: WorkOrderDetails,
    /// Client-generated 20-digit session identifier.
    pub session_id: SessionId,
}

impl SafetyCheckRequest {
    /// Wire value of the action discriminator.
    pub const ACTION: &'static str = "safetyCheck";

    /// Build a request with a freshly generated session id.
    #[must_use]
    pub fn new(token: String, work_order_details: WorkOrderDetails) -> Self {
        Self {
            action: Self::ACTION.to_owned(),
            token,
            work_order_details,
            session_id: SessionId::generate(),
        }
    }

    /// Serialize to the JSON text frame sent over the channel.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inbound
// ─────────────────────────────────────────────────────────────────────────────

/// Raw inbound frame shape; `message` nests the same shape one level down.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<Value>,
    message: Option<Box<RawMessage>>,
    #[serde(rename = "safetyCheckResponse")]
    safety_check_response: Option<String>,
    #[serde(rename = "safetyCheckPerformedAt")]
    safety_check_performed_at: Option<String>,
}

/// A typed inbound server message.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerMessage {
    /// Incremental output to append to the partial display buffer.
    Chunk {
        /// Raw text fragment; concatenated, never replacing prior content.
        content: String,
    },
    /// Agent reasoning trace; rationale text is nested in the payload.
    Trace {
        /// Raw trace payload as received.
        content: Option<Value>,
    },
    /// Server-side status ping; carries nothing the client acts on.
    Status,
    /// Terminal success payload.
    Final {
        /// Raw (unsanitized) report text.
        response: String,
        /// Server timestamp for when the check was performed.
        performed_at: Option<String>,
    },
    /// Terminal failure payload.
    Error {
        /// Server-supplied error text, if any.
        message: Option<String>,
    },
}

impl ServerMessage {
    /// Parse a raw JSON frame, unwrapping a one-level `message` envelope.
    pub fn parse(raw: &str) -> Result<Self, MessageParseError> {
        let outer: RawMessage = serde_json::from_str(raw)?;
        Self::from_raw(outer)
    }

    fn from_raw(outer: RawMessage) -> Result<Self, MessageParseError> {
        let RawMessage {
            kind,
            content,
            message,
            safety_check_response,
            safety_check_performed_at,
        } = outer;

        // The nested message wins for type/content; the final-response
        // fields fall back to the outer level when absent inside.
        let (kind, content, response, performed_at) = match message {
            Some(inner) => {
                let inner = *inner;
                (
                    inner.kind,
                    inner.content,
                    inner.safety_check_response.or(safety_check_response),
                    inner.safety_check_performed_at.or(safety_check_performed_at),
                )
            }
            None => (kind, content, safety_check_response, safety_check_performed_at),
        };

        let kind = kind.ok_or(MessageParseError::MissingKind)?;
        match kind.as_str() {
            "chunk" => Ok(Self::Chunk {
                content: content
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default(),
            }),
            "trace" => Ok(Self::Trace { content }),
            "status" => Ok(Self::Status),
            "final" => Ok(Self::Final {
                response: response.unwrap_or_default(),
                performed_at,
            }),
            "error" => Ok(Self::Error { message: response }),
            other => Err(MessageParseError::UnknownKind(other.to_owned())),
        }
    }

    /// Rationale text nested in a trace payload, if present.
    ///
    /// The agent emits `content.trace.orchestrationTrace.rationale.text`;
    /// traces without a rationale are skipped by the aggregator.
    #[must_use]
    pub fn rationale(&self) -> Option<&str> {
        match self {
            Self::Trace { content: Some(v) } => v
                .get("trace")?
                .get("orchestrationTrace")?
                .get("rationale")?
                .get("text")?
                .as_str(),
            _ => None,
        }
    }

    /// Whether this message ends a logical request.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }
}

/// Final sanitized safety-check result delivered to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    /// Sanitized report text.
    pub text: String,
    /// Server-reported completion timestamp, as received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performed_at: Option<String>,
}

impl SafetyReport {
    /// Parse the server timestamp, when present and RFC 3339.
    #[must_use]
    pub fn performed_at_time(&self) -> Option<DateTime<FixedOffset>> {
        self.performed_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }
}

/// Why an inbound frame could not be turned into a [`ServerMessage`].
#[derive(Debug, Error)]
pub enum MessageParseError {
    /// Frame was not valid JSON.
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),
    /// Frame had no `type` discriminator at either envelope level.
    #[error("frame has no message type")]
    MissingKind,
    /// Unrecognized `type` discriminator.
    #[error("unknown message type: {0}")]
    UnknownKind(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
