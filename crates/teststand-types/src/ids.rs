//! Type-safe identifier wrappers around [`Uuid`].
//!
//! The bridge holds no durable state, so these IDs exist purely for log
//! correlation: every admitted test run and every WebSocket connection
//! gets one so interleaved tracing lines can be stitched back together.
//! All IDs use UUID v7 (time-ordered) so sorted logs read chronologically.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one admitted test workflow attempt.
    RunId
}

define_id! {
    /// Unique identifier for a connected WebSocket client.
    ClientId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let run = RunId::new();
        let client = ClientId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(run.into_inner(), Uuid::nil());
        assert_ne!(client.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_display_matches_uuid() {
        let id = RunId::new();
        assert_eq!(id.to_string(), id.into_inner().to_string());
    }
}
