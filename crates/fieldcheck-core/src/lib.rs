//! # fieldcheck-core
//!
//! Foundation types and utilities shared by the fieldcheck crates:
//!
//! - **Branded IDs**: `SessionId`, `WorkOrderId`, `ConnectionId` newtypes for type safety
//! - **Wire messages**: outbound `SafetyCheckRequest`, inbound `ServerMessage` with
//!   transparent envelope unwrapping
//! - **Backoff**: `ReconnectPolicy` delay schedule for reconnection attempts
//! - **Sanitizer**: markup cleanup pipeline for final safety reports
//! - **Logging**: `tracing` subscriber bootstrap

#![deny(unsafe_code)]

pub mod backoff;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod sanitize;

pub use backoff::ReconnectPolicy;
pub use ids::{ConnectionId, SessionId, WorkOrderId};
pub use messages::{
    MessageParseError, SafetyCheckRequest, SafetyReport, ServerMessage, WorkOrderDetails,
};
pub use sanitize::sanitize;
