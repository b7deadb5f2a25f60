//! The delegated-signer authentication routine.
//!
//! This is the ledger-side half of the protocol: once an owner has bound
//! [`DelegatedSignerModule::authenticate_fn`] as their authentication
//! function, every transaction they send is checked by [`authenticate`]
//! instead of a plain signature check.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. the envelope decodes (`MalformedEnvelope`)
//! 2. the sender holds a grant valid at `now` (`NoActiveDelegation`)
//! 3. the envelope key is the granted key (`DelegateMismatch`)
//! 4. the signature verifies over the digest (`BadSignature`)

pub mod error;
pub mod module;
pub mod routine;

pub use error::VerificationError;
pub use module::DelegatedSignerModule;
pub use routine::{authenticate, check_envelope};
