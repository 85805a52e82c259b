//! Public-key identities supplied with every request.
//!
//! An identity is a secp256k1 point given as two hex coordinates. The server
//! manages no key lifecycle: whoever can sign for a point owns its key.

pub mod key;

use serde::Deserialize;
use std::fmt;

/// Maximum significant hex digits in a coordinate (256 bits).
const MAX_COORDINATE_DIGITS: usize = 64;

/// A non-negative curve coordinate, normalized to lowercase hex with no
/// leading zeros (`"0"` for zero).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Coordinate(String);

impl Coordinate {
    /// Parse a hex coordinate, accepting an optional `0x` prefix and any case.
    pub fn parse(input: &str) -> Result<Self, String> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        if digits.is_empty() {
            return Err("coordinate must not be empty".to_string());
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("coordinate {:?} is not hexadecimal", input));
        }

        let trimmed = digits.trim_start_matches('0');
        if trimmed.len() > MAX_COORDINATE_DIGITS {
            return Err(format!(
                "coordinate has {} significant hex digits, max {}",
                trimmed.len(),
                MAX_COORDINATE_DIGITS
            ));
        }

        let normalized = if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_ascii_lowercase()
        };
        Ok(Coordinate(normalized))
    }

    /// Normalized hex text.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Big-endian 32-byte encoding, left-padded with zeros.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let padded = format!("{:0>64}", self.0);
        let mut out = [0u8; 32];
        // Parse guarantees at most 64 hex digits, so decoding cannot fail.
        if hex::decode_to_slice(&padded, &mut out).is_err() {
            return [0u8; 32];
        }
        out
    }
}

impl TryFrom<String> for Coordinate {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Coordinate::parse(&value)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public-key identity (X, Y).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub x: Coordinate,
    pub y: Coordinate,
}

impl Identity {
    pub fn new(x: Coordinate, y: Coordinate) -> Self {
        Self { x, y }
    }
}
