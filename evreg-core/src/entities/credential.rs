use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal digits in a credential.
pub const CREDENTIAL_DIGITS: u32 = 12;

/// Smallest valid credential value (keeps the width fixed at 12 digits).
pub const CREDENTIAL_MIN: u64 = 100_000_000_000;

/// Size of the credential value space.
pub const CREDENTIAL_SPAN: u64 = 900_000_000_000;

/// The opaque single-use value a participant presents to redeem attendance.
///
/// Fixed-width 12-digit number, rendered and transported as a string so
/// leading digits are never lost. Globally unique among non-expired tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Credential(u64);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("credential must be exactly 12 digits")]
pub struct InvalidCredential;

impl Credential {
    /// Wrap a raw value, rejecting anything outside the 12-digit range.
    pub fn new(value: u64) -> Result<Self, InvalidCredential> {
        if (CREDENTIAL_MIN..CREDENTIAL_MIN + CREDENTIAL_SPAN).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidCredential)
        }
    }

    /// Map an arbitrary random word into the credential range.
    pub fn from_entropy(raw: u64) -> Self {
        Self(CREDENTIAL_MIN + raw % CREDENTIAL_SPAN)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Database representation (credentials fit comfortably in an `i64`).
    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }

    pub fn from_i64(value: i64) -> Result<Self, InvalidCredential> {
        u64::try_from(value)
            .map_err(|_| InvalidCredential)
            .and_then(Self::new)
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:012}", self.0)
    }
}

impl FromStr for Credential {
    type Err = InvalidCredential;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != CREDENTIAL_DIGITS as usize || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidCredential);
        }
        s.parse::<u64>().map_err(|_| InvalidCredential).and_then(Self::new)
    }
}

impl Serialize for Credential {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_display() {
        let c = Credential::new(100_000_000_042).unwrap();
        assert_eq!(c.to_string(), "100000000042");
        assert_eq!(c.to_string().len(), 12);
    }

    #[test]
    fn parse_round_trip() {
        let c = Credential::from_entropy(u64::MAX);
        let parsed: Credential = c.to_string().parse().unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn rejects_wrong_width_and_junk() {
        assert!("12345".parse::<Credential>().is_err());
        assert!("1234567890123".parse::<Credential>().is_err());
        assert!("12345678901a".parse::<Credential>().is_err());
        // 12 chars but below the fixed-width floor.
        assert!("099999999999".parse::<Credential>().is_err());
    }

    #[test]
    fn entropy_mapping_stays_in_range() {
        for raw in [0, 1, CREDENTIAL_SPAN, u64::MAX] {
            let c = Credential::from_entropy(raw);
            assert!(Credential::new(c.value()).is_ok());
        }
    }
}
