//! In-memory store backed by mutex-guarded maps.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use aegis_types::{AccountAddress, AuthenticationBinding, DelegationState};

use crate::binding::{BindOutcome, BindingStore};
use crate::delegation::DelegationStore;
use crate::StoreError;

/// Thread-safe in-memory delegation + binding store.
#[derive(Default)]
pub struct MemoryStore {
    delegations: Mutex<HashMap<AccountAddress, DelegationState>>,
    bindings: Mutex<HashMap<AccountAddress, AuthenticationBinding>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of delegators with stored state.
    pub fn delegation_count(&self) -> Result<usize, StoreError> {
        Ok(lock(&self.delegations)?.len())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Backend("store mutex poisoned".into()))
}

impl DelegationStore for MemoryStore {
    fn get_delegation(&self, delegator: &AccountAddress) -> Result<DelegationState, StoreError> {
        Ok(lock(&self.delegations)?
            .get(delegator)
            .cloned()
            .unwrap_or_default())
    }

    fn put_delegation(
        &self,
        delegator: &AccountAddress,
        state: DelegationState,
    ) -> Result<(), StoreError> {
        lock(&self.delegations)?.insert(*delegator, state);
        Ok(())
    }

    fn compare_and_swap_delegation(
        &self,
        delegator: &AccountAddress,
        expected: &DelegationState,
        new: DelegationState,
    ) -> Result<bool, StoreError> {
        let mut delegations = lock(&self.delegations)?;
        let current = delegations.get(delegator).cloned().unwrap_or_default();
        if &current != expected {
            return Ok(false);
        }
        delegations.insert(*delegator, new);
        Ok(true)
    }
}

impl BindingStore for MemoryStore {
    fn get_binding(&self, owner: &AccountAddress) -> Result<Option<AuthenticationBinding>, StoreError> {
        Ok(lock(&self.bindings)?.get(owner).cloned())
    }

    fn bind_if_absent(&self, binding: &AuthenticationBinding) -> Result<BindOutcome, StoreError> {
        let mut bindings = lock(&self.bindings)?;
        if let Some(existing) = bindings.get(&binding.owner) {
            return Ok(BindOutcome::Existing(existing.clone()));
        }
        bindings.insert(binding.owner, binding.clone());
        Ok(BindOutcome::Bound)
    }
}
