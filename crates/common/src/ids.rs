//! Newtype ids for every entity in the data model.
//!
//! Uuid-backed ids wrap [`uuid::Uuid`]; the bus agent hostname and session id
//! are not uuids in the source system, so they get their own newtypes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                Self(u)
            }
        }
    };
}

uuid_id!(BoardUuid);
uuid_id!(PluginUuid);
uuid_id!(ServiceUuid);
uuid_id!(ExposedServiceUuid);
uuid_id!(WebserviceUuid);
uuid_id!(EnabledWebserviceUuid);
uuid_id!(PortUuid);
uuid_id!(FleetUuid);
uuid_id!(RequestUuid);

/// A WAMP session id, as reported by the broker. Numeric, not a uuid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The hostname of a message-bus agent: the front-facing relay carrying
/// board WAMP sessions. Kept as a plain validated string rather than an
/// interned id -- the fleet of bus agents is small and long-lived, unlike
/// boards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusAgentHostname(pub String);

impl BusAgentHostname {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl fmt::Display for BusAgentHostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for BusAgentHostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uuid_id_roundtrips_through_display_and_fromstr() {
        let id = BoardUuid::new();
        let s = id.to_string();
        assert_eq!(id, BoardUuid::from_str(&s).unwrap());
    }
}
