//! Account address type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A 32-byte account address.
///
/// Derived from a public key by `aegis_crypto::derive_address`. Rendered as
/// `0x` followed by 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    /// Length of an address in bytes.
    pub const LENGTH: usize = 32;

    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a hex address, with or without `0x`.
    ///
    /// Short forms are left-padded with zeros, so `0x1` is the address whose
    /// last byte is `1`.
    pub fn from_hex_literal(literal: &str) -> Result<Self, ParseError> {
        let digits = literal.strip_prefix("0x").unwrap_or(literal);
        if digits.is_empty() || digits.len() > Self::LENGTH * 2 {
            return Err(ParseError::Address(literal.to_string()));
        }

        let padded = format!("{:0>64}", digits);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|_| ParseError::Address(literal.to_string()))?;
        Ok(Self(bytes))
    }

    /// Full-length `0x`-prefixed hex form.
    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress(0x{})", hex::encode(&self.0[..4]))
    }
}

impl FromStr for AccountAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_literal(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_literal_is_left_padded() {
        let addr = AccountAddress::from_hex_literal("0x1").unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 1;
        assert_eq!(addr.as_bytes(), &expected);
    }

    #[test]
    fn display_roundtrips_through_parse() {
        let addr = AccountAddress::new([0xAB; 32]);
        let parsed: AccountAddress = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
        assert_eq!(addr.to_hex_literal().len(), 66);
    }

    #[test]
    fn bare_hex_is_accepted() {
        let addr = AccountAddress::from_hex_literal("ff").unwrap();
        assert_eq!(addr.as_bytes()[31], 0xFF);
    }

    #[test]
    fn rejects_garbage() {
        assert!(AccountAddress::from_hex_literal("").is_err());
        assert!(AccountAddress::from_hex_literal("0x").is_err());
        assert!(AccountAddress::from_hex_literal("0xzz").is_err());
        assert!(AccountAddress::from_hex_literal(&"1".repeat(65)).is_err());
    }
}
