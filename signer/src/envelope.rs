//! Authenticator envelope wire format.
//!
//! ```text
//! uleb128(32) ‖ public_key[32] ‖ uleb128(64) ‖ signature[64]
//! ```
//!
//! Each field is a length-prefixed byte vector and the order is fixed: the
//! authentication routine reads the key first, then the signature. The
//! envelope carries no expiry or identity of its own; authority comes from
//! the grant stored for the transaction sender.

use aegis_types::{AuthError, PublicKey, Signature};
use thiserror::Error;

/// Encoded size of an envelope: two one-byte length prefixes plus the fields.
pub const ENVELOPE_LEN: usize = 1 + PublicKey::LENGTH + 1 + Signature::LENGTH;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("unreadable {field} length prefix: {reason}")]
    LengthPrefix { field: &'static str, reason: String },

    #[error("{field} must be {expected} bytes, prefix says {actual}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: u64,
    },

    #[error("envelope truncated inside {field}")]
    Truncated { field: &'static str },

    #[error("{0} trailing bytes after signature")]
    TrailingBytes(usize),
}

impl From<EnvelopeError> for AuthError {
    fn from(e: EnvelopeError) -> Self {
        AuthError::MalformedEnvelope(e.to_string())
    }
}

/// A delegate's proof over one message digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatorEnvelope {
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl AuthenticatorEnvelope {
    pub fn new(public_key: PublicKey, signature: Signature) -> Self {
        Self {
            public_key,
            signature,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENVELOPE_LEN);
        write_field(&mut out, self.public_key.as_bytes());
        write_field(&mut out, self.signature.as_bytes());
        out
    }

    /// Strict decode: exact field lengths, no trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let mut cursor = bytes;
        let public_key = read_field::<32>(&mut cursor, "public key")?;
        let signature = read_field::<64>(&mut cursor, "signature")?;
        if !cursor.is_empty() {
            return Err(EnvelopeError::TrailingBytes(cursor.len()));
        }
        Ok(Self {
            public_key: PublicKey(public_key),
            signature: Signature(signature),
        })
    }
}

fn write_field(out: &mut Vec<u8>, field: &[u8]) {
    leb128::write::unsigned(out, field.len() as u64).expect("writing to a Vec cannot fail");
    out.extend_from_slice(field);
}

fn read_field<const N: usize>(
    cursor: &mut &[u8],
    field: &'static str,
) -> Result<[u8; N], EnvelopeError> {
    let len = leb128::read::unsigned(cursor).map_err(|e| EnvelopeError::LengthPrefix {
        field,
        reason: e.to_string(),
    })?;
    if len != N as u64 {
        return Err(EnvelopeError::FieldLength {
            field,
            expected: N,
            actual: len,
        });
    }
    if cursor.len() < N {
        return Err(EnvelopeError::Truncated { field });
    }
    let (head, rest) = cursor.split_at(N);
    let mut value = [0u8; N];
    value.copy_from_slice(head);
    *cursor = rest;
    Ok(value)
}
