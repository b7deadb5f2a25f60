//! Per-account storage traits for delegation state and authentication bindings.
//!
//! Every backend implements these traits; the rest of the workspace depends
//! only on the traits. State is keyed by account address and never shared
//! across accounts. [`MemoryStore`] is the in-process backend.

pub mod binding;
pub mod delegation;
pub mod error;
pub mod memory;

pub use binding::{BindOutcome, BindingStore};
pub use delegation::DelegationStore;
pub use error::StoreError;
pub use memory::MemoryStore;
