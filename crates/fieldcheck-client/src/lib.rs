//! # fieldcheck-client
//!
//! Long-lived, authenticated, reconnecting duplex-streaming client for the
//! safety-check protocol.
//!
//! A [`SafetyCheckClient`] owns one channel (WebSocket in production) and
//! drives logical requests over it: [`SafetyCheckClient::submit`] sends a
//! single stateful request with a fresh token and a unique session id, then
//! inbound `chunk` / `trace` / `final` / `error` messages are fanned out to
//! the request's stream aggregator and completion guard. Each request
//! resolves with exactly one terminal outcome — success, server error, or
//! deadline timeout — even under connection loss, slow servers, or
//! malformed input.
//!
//! Components:
//! - [`connection`]: channel ownership, lifecycle events, passive reconnect
//!   with exponential backoff
//! - [`dispatch`]: handler registry with snapshot-per-broadcast semantics
//! - [`aggregate`]: incremental chunk and trace accumulation
//! - [`guard`]: exactly-once completion with a deadline timer
//! - [`transport`]: the duplex channel boundary and its WebSocket adapter
//! - [`config`]: file- and environment-layered client settings

#![deny(unsafe_code)]

pub mod aggregate;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod errors;
pub mod guard;
pub mod transport;

pub use aggregate::StreamAggregator;
pub use client::{PendingSafetyCheck, SafetyCheckClient};
pub use config::{ClientConfig, ConfigError, config_path, load_config, load_config_from_path};
pub use connection::{ConnectionError, ConnectionEvent, ConnectionManager, ConnectionState};
pub use dispatch::{Handler, HandlerId, MessageDispatcher};
pub use errors::CheckError;
pub use guard::{CheckResult, CompletionGuard};
pub use transport::{ChannelEvent, ChannelHandle, Connector, TransportError, WsConnector};
