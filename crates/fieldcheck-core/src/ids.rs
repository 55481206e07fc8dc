//! Branded ID newtypes for type safety.
//!
//! Wire-facing identifiers are distinct newtypes around `String` so a
//! session id cannot be passed where a work order id is expected. All are
//! serde-transparent: they serialize as plain strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a client-generated session identifier.
pub const SESSION_ID_LEN: usize = 20;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Client-generated identifier for one logical safety-check request.
    ///
    /// Opaque to the client itself: generated, sent, never interpreted.
    SessionId
}

branded_id! {
    /// Identifier of a work order in the work-order system.
    WorkOrderId
}

branded_id! {
    /// Identifier for one live channel instance.
    ConnectionId
}

impl SessionId {
    /// Generate a fresh session id: [`SESSION_ID_LEN`] random decimal digits.
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;

        let mut rng = rand::rng();
        let digits: String = (0..SESSION_ID_LEN)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        Self(digits)
    }
}

impl ConnectionId {
    /// Create a new random connection id (UUID v7, time-ordered).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_twenty_digits() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), SESSION_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn session_ids_are_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn connection_id_is_uuid_v7() {
        let id = ConnectionId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn from_string() {
        let id = WorkOrderId::from_string("wo-1042".to_owned());
        assert_eq!(id.as_str(), "wo-1042");
    }

    #[test]
    fn from_str_ref() {
        let id = SessionId::from("12345678901234567890");
        assert_eq!(id.as_str(), "12345678901234567890");
    }

    #[test]
    fn deref_to_str() {
        let id = WorkOrderId::from("wo-7");
        let s: &str = &id;
        assert_eq!(s, "wo-7");
    }

    #[test]
    fn display() {
        let id = SessionId::from("00000000000000000042");
        assert_eq!(format!("{id}"), "00000000000000000042");
    }

    #[test]
    fn into_string() {
        let id = WorkOrderId::from("wo-9");
        let s: String = id.into();
        assert_eq!(s, "wo-9");
    }

    #[test]
    fn serde_is_transparent() {
        let id = SessionId::from("11112222333344445555");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"11112222333344445555\"");
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn hash_and_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let id = WorkOrderId::from("same");
        let _ = set.insert(id.clone());
        let _ = set.insert(id.clone());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn into_inner() {
        let id = SessionId::from("98765432109876543210");
        assert_eq!(id.into_inner(), "98765432109876543210");
    }
}
