//! Transactions and their signing digests.
//!
//! ```text
//! signing_digest = blake2b_256("AEGIS::RawTransaction" ‖ bincode(raw))
//! hash           = blake2b_256("AEGIS::SignedTransaction" ‖ bincode(signed))
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use aegis_crypto::blake2b_256_multi;
use aegis_signer::{TransactionAuthenticator, TransactionSigner};
use aegis_types::{AccountAddress, Clock, FunctionRef, NetworkId, PublicKey, Timestamp, TxHash};

use crate::error::LedgerError;

const RAW_TRANSACTION_SALT: &[u8] = b"AEGIS::RawTransaction";
const SIGNED_TRANSACTION_SALT: &[u8] = b"AEGIS::SignedTransaction";

/// What a transaction does once it executes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Replace the sender's default signature check with `function`.
    EnableAbstraction { function: FunctionRef },

    /// Call the delegation module's grant entry point.
    DelegateForSeconds {
        entry: FunctionRef,
        delegate_public_key: PublicKey,
        seconds: u64,
    },

    /// Call the delegation module's revoke entry point.
    RevokeDelegation { entry: FunctionRef },

    /// Move `amount` native coins from the sender to `to`.
    Transfer { to: AccountAddress, amount: u64 },
}

impl Payload {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EnableAbstraction { .. } => "enable_abstraction",
            Self::DelegateForSeconds { .. } => "delegate_for_seconds",
            Self::RevokeDelegation { .. } => "revoke_delegation",
            Self::Transfer { .. } => "transfer",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: Payload,
    /// The ledger discards the transaction at or after this instant.
    pub expiration: Timestamp,
    pub network: NetworkId,
}

impl RawTransaction {
    /// The bytes every authenticator signs.
    pub fn signing_digest(&self) -> Result<[u8; 32], LedgerError> {
        let encoded = bincode::serialize(self).map_err(|e| LedgerError::Encoding(e.to_string()))?;
        Ok(blake2b_256_multi(&[RAW_TRANSACTION_SALT, &encoded]))
    }

    /// Authorize this transaction with `signer`.
    ///
    /// The signer must be for `self.sender`.
    pub fn sign(self, signer: &dyn TransactionSigner) -> Result<SignedTransaction, LedgerError> {
        if signer.address() != self.sender {
            return Err(LedgerError::SignerMismatch {
                signer: signer.address(),
                sender: self.sender,
            });
        }
        let digest = self.signing_digest()?;
        let authenticator = signer.authenticate(&digest)?;
        Ok(SignedTransaction {
            raw: self,
            authenticator,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub raw: RawTransaction,
    pub authenticator: TransactionAuthenticator,
}

impl SignedTransaction {
    pub fn sender(&self) -> &AccountAddress {
        &self.raw.sender
    }

    /// Identity used by the ledger to deduplicate resubmissions.
    pub fn hash(&self) -> Result<TxHash, LedgerError> {
        let encoded = bincode::serialize(self).map_err(|e| LedgerError::Encoding(e.to_string()))?;
        Ok(TxHash::new(blake2b_256_multi(&[SIGNED_TRANSACTION_SALT, &encoded])))
    }
}

/// Stamps raw transactions with network and expiration.
#[derive(Clone)]
pub struct TransactionFactory {
    network: NetworkId,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl TransactionFactory {
    pub const DEFAULT_TTL_SECS: u64 = 30;

    pub fn new(network: NetworkId, clock: Arc<dyn Clock>) -> Self {
        Self {
            network,
            ttl_secs: Self::DEFAULT_TTL_SECS,
            clock,
        }
    }

    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn raw(&self, sender: AccountAddress, sequence_number: u64, payload: Payload) -> RawTransaction {
        let now = self.clock.now();
        RawTransaction {
            sender,
            sequence_number,
            payload,
            expiration: now.checked_add_secs(self.ttl_secs).unwrap_or(Timestamp::new(u64::MAX)),
            network: self.network,
        }
    }
}
