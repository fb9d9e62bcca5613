//! Branded ID newtypes for type safety.
//!
//! Users, notifications, and connections each get a distinct ID type
//! implemented as a newtype wrapper around `String`, so a connection ID can
//! never be passed where a user ID is expected.
//!
//! Generated IDs are UUID v7 (time-ordered) via [`uuid::Uuid::now_v7`], which
//! keeps notification IDs sortable by mint time and collision-free for the
//! life of the process. User IDs normally arrive from the outside and are
//! wrapped as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7().to_string())
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

        impl Default for $name {
            fn default() -> Self {
                Self::new()
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
    /// Logical user identity, as supplied by the client on registration.
    UserId
}

branded_id! {
    /// Unique identifier for a single notification.
    NotificationId
}

branded_id! {
    /// Unique identifier for one live transport connection.
    ConnectionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_id_new_is_uuid_v7() {
        let id = NotificationId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn connection_id_new_is_uuid_v7() {
        let id = ConnectionId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = NotificationId::new();
        let b = NotificationId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_ids_are_time_ordered() {
        // UUID v7 sorts lexicographically by creation time.
        let a = NotificationId::new();
        let b = NotificationId::new();
        assert!(a.as_str() <= b.as_str());
    }

    #[test]
    fn user_id_wraps_external_value() {
        let id = UserId::from("alice");
        assert_eq!(id.as_str(), "alice");
    }

    #[test]
    fn display() {
        let id = UserId::from("bob");
        assert_eq!(format!("{id}"), "bob");
    }

    #[test]
    fn into_string() {
        let id = UserId::from("carol");
        let s: String = id.into();
        assert_eq!(s, "carol");
    }

    #[test]
    fn into_inner() {
        let id = ConnectionId::from("conn-9");
        assert_eq!(id.into_inner(), "conn-9");
    }

    #[test]
    fn serde_is_transparent() {
        let id = UserId::from("dave");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dave\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn hash_and_eq() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        let id = UserId::from("same");
        let _ = set.insert(id.clone());
        let _ = set.insert(id);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn default_creates_unique() {
        assert_ne!(NotificationId::default(), NotificationId::default());
    }
}
