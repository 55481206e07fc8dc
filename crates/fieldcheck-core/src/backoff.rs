//! Reconnection backoff schedule.
//!
//! [`ReconnectPolicy`] holds the parameters; [`ReconnectPolicy::delay_for_attempt`]
//! computes the delay before a given attempt or reports that the attempt
//! budget is spent.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum consecutive reconnect attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default base delay in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Default delay cap in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Parameters for the passive reconnect loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Maximum consecutive attempts before giving up (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential backoff in ms (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on the computed delay in ms (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect `attempt` (1-based).
    ///
    /// Formula: `min(base_delay · 2^(attempt−1), max_delay)`. Returns `None`
    /// for attempt 0 and once the attempt budget is spent; a `None` means no
    /// further attempt may be scheduled.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let exponential = self
            .base_delay_ms
            .saturating_mul(1u64 << (attempt - 1).min(31));
        Some(Duration::from_millis(exponential.min(self.max_delay_ms)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_defaults() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 30_000);
    }

    #[test]
    fn delays_double_per_attempt() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (1..=5)
            .map(|n| policy.delay_for_attempt(n).unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16_000]);
    }

    #[test]
    fn attempt_zero_is_none() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), None);
    }

    #[test]
    fn budget_spent_after_max_attempts() {
        let policy = ReconnectPolicy::default();
        assert!(policy.delay_for_attempt(5).is_some());
        assert_eq!(policy.delay_for_attempt(6), None);
        assert_eq!(policy.delay_for_attempt(100), None);
    }

    #[test]
    fn delay_caps_at_max() {
        let policy = ReconnectPolicy {
            max_attempts: 10,
            ..ReconnectPolicy::default()
        };
        // attempt 7 would be 64000ms uncapped
        assert_eq!(
            policy.delay_for_attempt(7),
            Some(Duration::from_millis(30_000))
        );
    }

    #[test]
    fn high_attempt_does_not_overflow() {
        let policy = ReconnectPolicy {
            max_attempts: u32::MAX,
            ..ReconnectPolicy::default()
        };
        let delay = policy.delay_for_attempt(4000).unwrap();
        assert_eq!(delay, Duration::from_millis(30_000));
    }

    #[test]
    fn serde_defaults_from_empty_object() {
        let policy: ReconnectPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy, ReconnectPolicy::default());
    }

    #[test]
    fn serde_roundtrip_camel_case() {
        let policy = ReconnectPolicy {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        };
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"maxAttempts\":3"));
        assert!(json.contains("\"baseDelayMs\":500"));
        let back: ReconnectPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
