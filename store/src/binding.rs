//! Authentication binding storage trait.

use crate::StoreError;
use aegis_types::{AccountAddress, AuthenticationBinding};

/// Result of [`BindingStore::bind_if_absent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindOutcome {
    /// No binding existed; the new one is stored.
    Bound,
    /// A binding already existed and was left as is.
    Existing(AuthenticationBinding),
}

/// One authentication binding per owner.
pub trait BindingStore: Send + Sync {
    fn get_binding(&self, owner: &AccountAddress) -> Result<Option<AuthenticationBinding>, StoreError>;

    /// Store `binding` unless the owner already has one.
    fn bind_if_absent(&self, binding: &AuthenticationBinding) -> Result<BindOutcome, StoreError>;
}
