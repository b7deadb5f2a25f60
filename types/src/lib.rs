//! Fundamental types for Aegis delegated signing.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! account addresses, keys, timestamps, routine references, the delegation grant
//! state machine, and the authentication rejection taxonomy.

pub mod address;
pub mod delegation;
pub mod error;
pub mod function;
pub mod hash;
pub mod keys;
pub mod network;
pub mod time;

pub use address::AccountAddress;
pub use delegation::{AuthenticationBinding, DelegationGrant, DelegationState, GrantError, GrantPhase};
pub use error::{AuthError, ParseError};
pub use function::FunctionRef;
pub use hash::TxHash;
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use network::NetworkId;
pub use time::{Clock, SystemClock, Timestamp};
