//! References to on-ledger functions (`<address>::<module>::<function>`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::address::AccountAddress;
use crate::error::ParseError;

/// A fully qualified on-ledger function, e.g. `0x1::delegated_signer::authenticate`.
///
/// Serialized as its string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    address: AccountAddress,
    module: String,
    function: String,
}

impl FunctionRef {
    pub fn new(
        address: AccountAddress,
        module: impl Into<String>,
        function: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let module = module.into();
        let function = function.into();
        if !is_identifier(&module) || !is_identifier(&function) {
            return Err(ParseError::Function(format!("{address}::{module}::{function}")));
        }
        Ok(Self {
            address,
            module,
            function,
        })
    }

    pub fn address(&self) -> &AccountAddress {
        &self.address
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// Another function in the same module.
    pub fn sibling(&self, function: &str) -> Result<Self, ParseError> {
        Self::new(self.address, self.module.clone(), function)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.function)
    }
}

impl FromStr for FunctionRef {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split("::");
        let (Some(address), Some(module), Some(function), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::Function(s.to_string()));
        };
        let address = AccountAddress::from_hex_literal(address)
            .map_err(|_| ParseError::Function(s.to_string()))?;
        Self::new(address, module, function)
    }
}

impl Serialize for FunctionRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FunctionRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
