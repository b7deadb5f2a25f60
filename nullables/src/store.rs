//! Nullable store: in-memory storage with write-failure injection.

use std::sync::atomic::{AtomicBool, Ordering};

use aegis_store::{BindOutcome, BindingStore, DelegationStore, MemoryStore, StoreError};
use aegis_types::{AccountAddress, AuthenticationBinding, DelegationState};

/// A [`MemoryStore`] whose writes can be made to fail on demand.
#[derive(Default)]
pub struct NullStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write returns `StoreError::Backend`. Reads still work.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        Ok(())
    }
}

impl DelegationStore for NullStore {
    fn get_delegation(&self, delegator: &AccountAddress) -> Result<DelegationState, StoreError> {
        self.inner.get_delegation(delegator)
    }

    fn put_delegation(
        &self,
        delegator: &AccountAddress,
        state: DelegationState,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        self.inner.put_delegation(delegator, state)
    }

    fn compare_and_swap_delegation(
        &self,
        delegator: &AccountAddress,
        expected: &DelegationState,
        new: DelegationState,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        self.inner.compare_and_swap_delegation(delegator, expected, new)
    }
}

impl BindingStore for NullStore {
    fn get_binding(&self, owner: &AccountAddress) -> Result<Option<AuthenticationBinding>, StoreError> {
        self.inner.get_binding(owner)
    }

    fn bind_if_absent(&self, binding: &AuthenticationBinding) -> Result<BindOutcome, StoreError> {
        self.check_writable()?;
        self.inner.bind_if_absent(binding)
    }
}
