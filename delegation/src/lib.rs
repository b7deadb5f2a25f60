//! Owner-side delegation lifecycle.
//!
//! [`DelegationController`] drives the three state-changing operations
//! against a ledger and keeps a local mirror of what has committed:
//!
//! 1. `enable_abstraction` binds the owner's account to the
//!    `delegated_signer::authenticate` routine
//! 2. `delegate` grants a delegate key for a number of seconds
//! 3. `revoke` ends the grant early
//!
//! Once a grant is active, [`DelegationController::abstracted_signer`] hands
//! out an [`AbstractedSigner`](aegis_signer::AbstractedSigner) that signs
//! transactions *as the owner* with the delegate's key.
//!
//! Each operation is also an orchestrator [`Step`](aegis_orchestrator::Step)
//! (see [`steps`]) so it can be placed in an ordered sequence.

pub mod controller;
pub mod error;
pub mod steps;

pub use controller::DelegationController;
pub use error::DelegationError;
pub use steps::{DelegateStep, DelegatedTransactionStep, EnableStep, RevokeStep};
