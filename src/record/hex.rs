//! Hex byte strings
//!
//! Written as `0x`-prefixed hex on input and output. Input is
//! case-insensitive; output is always lowercase. Ordering is bytewise.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A byte string rendered as `0x…`
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Hex(Vec<u8>);

impl Hex {
    /// Wraps raw bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parses a `0x`-prefixed hex string
    pub fn parse(s: &str) -> Result<Self, String> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| format!("hex value '{}' must start with 0x", s))?;
        hex::decode(digits)
            .map(Self)
            .map_err(|e| format!("invalid hex value '{}': {}", s, e))
    }

    /// Returns the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hex({})", self)
    }
}

impl FromStr for Hex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Hex {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Hex> for String {
    fn from(value: Hex) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case() {
        let hex = Hex::parse("0xABcd").unwrap();
        assert_eq!(hex.as_bytes(), &[0xab, 0xcd]);
        assert_eq!(hex.to_string(), "0xabcd");
    }

    #[test]
    fn test_parse_rejects_missing_prefix_and_odd_length() {
        assert!(Hex::parse("abcd").is_err());
        assert!(Hex::parse("0xabc").is_err());
        assert!(Hex::parse("0xzz").is_err());
    }

    #[test]
    fn test_empty_hex() {
        let hex = Hex::parse("0x").unwrap();
        assert!(hex.as_bytes().is_empty());
    }

    #[test]
    fn test_ordering_is_bytewise() {
        assert!(Hex::parse("0x01").unwrap() < Hex::parse("0x0100").unwrap());
        assert!(Hex::parse("0x02").unwrap() > Hex::parse("0x0100").unwrap());
    }
}
