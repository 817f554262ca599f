//! Opaque, totally-ordered entity identifiers.
//!
//! Each entity kind gets its own newtype so a `StationId` and an `EvseId`
//! can never be swapped by accident at a call site, even though both wrap
//! a `String`. Identifiers are immutable for the entity's lifetime.

use std::fmt;

macro_rules! entity_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Build an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }
    };
}

entity_id!(EvseId, "Identifier of an EVSE, unique within its charging station.");
entity_id!(StationId, "Identifier of a charging station, unique within its pool.");
entity_id!(PoolId, "Identifier of a charging pool, unique within its operator.");
entity_id!(OperatorId, "Identifier of a charging station operator.");
entity_id!(ReservationId, "Identifier of a reservation, unique within the roaming network.");
entity_id!(SessionId, "Identifier of a charging session, unique within the roaming network.");
entity_id!(ProviderId, "Identifier of an operator roaming provider.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_ordered_like_their_strings() {
        let a = EvseId::new("DE*ABC*E1");
        let b = EvseId::new("DE*ABC*E2");
        assert!(a < b);
        assert_eq!(a, EvseId::new("DE*ABC*E1"));
    }

    #[test]
    fn ids_display_as_their_raw_string() {
        let id = StationId::from("DE*ABC*S123456");
        assert_eq!(id.to_string(), "DE*ABC*S123456");
        assert_eq!(id.as_str(), "DE*ABC*S123456");
    }
}
