//! Strongly-typed identifiers used across the workspace.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Number assigned to a resolved client identity.
///
/// Client numbers are handed out sequentially from a configurable base and
/// are never reused within a report run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientIdNo(u64);

impl ClientIdNo {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// The number following this one.
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl core::fmt::Display for ClientIdNo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for ClientIdNo {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<ClientIdNo> for u64 {
    fn from(value: ClientIdNo) -> Self {
        value.0
    }
}

impl FromStr for ClientIdNo {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u64>()
            .map_err(|e| DomainError::invalid_id("client idno", e))?;
        Ok(Self(value))
    }
}

/// Short indicator naming a destination report (e.g. `fb`, `ims`).
///
/// Indicators are case-insensitive; the stored form is trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(String);

impl DestinationId {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim().to_lowercase();
        if value.is_empty() {
            return Err(DomainError::EmptyIndicator);
        }
        if value.contains(',') {
            return Err(DomainError::MultipleDestinations(value));
        }
        if value.contains(['/', '\\']) || value.contains("..") {
            return Err(DomainError::UnsafeIndicator(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for DestinationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DestinationId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of one report run (log correlation).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::from_str(s)
                    .map_err(|e| DomainError::invalid_id($name, e))?;
                Ok(Self(uuid))
            }
        }
    };
}

impl_uuid_newtype!(RunId, "run id");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_idno_parses_and_advances() {
        let id: ClientIdNo = " 1000 ".parse().unwrap();
        assert_eq!(id, ClientIdNo::new(1000));
        assert_eq!(id.next().get(), 1001);
        assert!("abc".parse::<ClientIdNo>().is_err());
    }

    #[test]
    fn destination_id_is_case_insensitive() {
        let a = DestinationId::parse(" FB ").unwrap();
        let b: DestinationId = "fb".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "fb");
    }

    #[test]
    fn destination_id_rejects_empty_and_lists() {
        assert!(matches!(DestinationId::parse("  "), Err(DomainError::EmptyIndicator)));
        assert!(matches!(
            DestinationId::parse("fb,ims"),
            Err(DomainError::MultipleDestinations(_))
        ));
    }

    #[test]
    fn destination_id_rejects_path_characters() {
        for raw in ["fb/ims", "..", "a\\b", "../fb"] {
            assert!(
                matches!(DestinationId::parse(raw), Err(DomainError::UnsafeIndicator(_))),
                "{raw}"
            );
        }
        assert!(DestinationId::parse("fb.ims").is_ok());
    }

    #[test]
    fn run_id_round_trips_through_display() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
