//! Client configuration with file and environment overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ClientConfig::default()`]
//! 2. If the config file exists, deep-merge user values over defaults
//! 3. Apply `FIELDCHECK_*` environment overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use fieldcheck_core::backoff::ReconnectPolicy;

/// Default completion deadline in milliseconds.
pub const DEFAULT_DEADLINE_MS: u64 = 120_000;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file read failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file was not valid JSON or did not match the schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// WebSocket endpoint of the safety-check backend.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Completion deadline per logical request, in milliseconds.
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    /// Passive reconnection schedule.
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
}

fn default_endpoint() -> String {
    "ws://localhost:9443/safetycheck".to_owned()
}

fn default_deadline_ms() -> u64 {
    DEFAULT_DEADLINE_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            deadline_ms: DEFAULT_DEADLINE_MS,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Completion deadline as a [`Duration`].
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Resolve the path to the config file (`~/.fieldcheck/config.json`).
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".fieldcheck").join("config.json")
}

/// Load config from the default path with env var overrides.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(&config_path())
}

/// Load config from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_config_from_path(path: &Path) -> Result<ClientConfig, ConfigError> {
    let defaults = serde_json::to_value(ClientConfig::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading config from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "config file not found, using defaults");
        defaults
    };

    let mut config: ClientConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Integers must parse and fall within the given range; invalid values are
/// logged and ignored (falling back to file/default).
pub fn apply_env_overrides(config: &mut ClientConfig) {
    if let Some(v) = read_env_string("FIELDCHECK_ENDPOINT") {
        config.endpoint = v;
    }
    if let Some(v) = read_env_u64("FIELDCHECK_DEADLINE_MS", 1000, 3_600_000) {
        config.deadline_ms = v;
    }
    if let Some(v) = read_env_u32("FIELDCHECK_MAX_RECONNECTS", 1, 100) {
        config.reconnect.max_attempts = v;
    }
    if let Some(v) = read_env_u64("FIELDCHECK_RECONNECT_BASE_MS", 100, 60_000) {
        config.reconnect.base_delay_ms = v;
    }
    if let Some(v) = read_env_u64("FIELDCHECK_RECONNECT_MAX_MS", 100, 600_000) {
        config.reconnect.max_delay_ms = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
