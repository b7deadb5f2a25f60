//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the delegation flow (clock, ledger,
//! storage, signing capability) has a test-friendly implementation here that:
//! - returns deterministic values
//! - can be controlled programmatically, including fault injection
//! - never touches the filesystem or network
//!
//! [`NullLedger`] doubles as the in-process ledger behind the `local` network.

pub mod clock;
pub mod ledger;
pub mod signer;
pub mod store;

pub use clock::NullClock;
pub use ledger::NullLedger;
pub use signer::NullSigner;
pub use store::NullStore;
