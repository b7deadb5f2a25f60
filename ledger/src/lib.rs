//! Ledger-facing side of Aegis.
//!
//! - [`transaction`]: raw/signed transactions, payloads and signing digests
//! - [`client`]: the [`LedgerClient`] trait plus bounded confirmation helpers
//! - [`rpc`]: JSON-RPC over HTTP implementation of [`LedgerClient`]

pub mod client;
pub mod error;
pub mod rpc;
pub mod transaction;

pub use client::{
    build_signed, confirm, submit_and_confirm, CommittedTransaction, ExecutionStatus,
    LedgerClient, PendingTransaction,
};
pub use error::{LedgerError, RejectionReason};
pub use rpc::RpcLedgerClient;
pub use transaction::{Payload, RawTransaction, SignedTransaction, TransactionFactory};
