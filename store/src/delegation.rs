//! Delegation state storage trait.

use crate::StoreError;
use aegis_types::{AccountAddress, DelegationState};

/// Per-delegator grant state.
///
/// Writers that read-modify-write must use [`compare_and_swap_delegation`]
/// so two concurrent grants for the same delegator cannot both win.
///
/// [`compare_and_swap_delegation`]: DelegationStore::compare_and_swap_delegation
pub trait DelegationStore: Send + Sync {
    /// Stored state, `NoGrant` if the delegator was never seen.
    fn get_delegation(&self, delegator: &AccountAddress) -> Result<DelegationState, StoreError>;

    /// Unconditionally overwrite the stored state.
    fn put_delegation(
        &self,
        delegator: &AccountAddress,
        state: DelegationState,
    ) -> Result<(), StoreError>;

    /// Replace the stored state with `new` only if it currently equals `expected`.
    ///
    /// Returns `true` if the swap happened.
    fn compare_and_swap_delegation(
        &self,
        delegator: &AccountAddress,
        expected: &DelegationState,
        new: DelegationState,
    ) -> Result<bool, StoreError>;
}
