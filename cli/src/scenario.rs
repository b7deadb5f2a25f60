//! The client flow: fund, enable, delegate, then transfer as the owner
//! with the delegate's key.

use std::sync::Arc;
use std::time::Duration;

use aegis_delegation::{DelegationController, DelegationError};
use aegis_ledger::{
    build_signed, submit_and_confirm, CommittedTransaction, LedgerClient, Payload,
    TransactionFactory,
};
use aegis_signer::{DigestSigner, TransactionSigner};
use aegis_types::{AccountAddress, Clock, DelegationGrant, FunctionRef, NetworkId, TxHash};
use aegis_utils::format_duration;
use aegis_verification::module::REVOKE_FN;
use aegis_verification::DelegatedSignerModule;

/// Units sent from the faucet to the owner before enabling.
pub const FAUCET_AMOUNT: u64 = 100_000_000;

/// Units the delegated transfer moves (owner to owner).
pub const TRANSFER_AMOUNT: u64 = 1;

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub funded: bool,
    pub grant: DelegationGrant,
    pub transfer: CommittedTransaction,
}

impl RunReport {
    pub fn transfer_hash(&self) -> TxHash {
        self.transfer.hash
    }
}

/// The account a delegate key would own on its own.
pub fn delegate_address(delegate: &dyn DigestSigner) -> AccountAddress {
    aegis_crypto::derive_address(&delegate.public_key())
}

pub struct Scenario {
    ledger: Arc<dyn LedgerClient>,
    controller: DelegationController,
    network: NetworkId,
    routine: FunctionRef,
    timeout: Duration,
}

impl Scenario {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        network: NetworkId,
        publisher: AccountAddress,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        let factory = TransactionFactory::new(network, clock);
        let controller = DelegationController::in_memory(ledger.clone(), factory, timeout);
        Self {
            ledger,
            controller,
            network,
            routine: DelegatedSignerModule::authenticate_ref(publisher),
            timeout,
        }
    }

    /// `<publisher>::delegated_signer::authenticate`.
    pub fn routine(&self) -> &FunctionRef {
        &self.routine
    }

    pub fn controller(&self) -> &DelegationController {
        &self.controller
    }

    /// Run the whole flow and return the committed transfer.
    ///
    /// Stops at the first failing stage; nothing after it is submitted.
    pub async fn run(
        &self,
        owner: Arc<dyn TransactionSigner>,
        delegate: Arc<dyn DigestSigner>,
        delegation_seconds: u64,
    ) -> Result<RunReport, DelegationError> {
        let address = owner.address();

        let funded = self.network.has_faucet();
        if funded {
            tracing::info!(%address, amount = FAUCET_AMOUNT, "funding owner account from faucet");
            self.ledger.fund_account(&address, FAUCET_AMOUNT).await?;
        }

        tracing::info!(%address, routine = %self.routine, "enabling account abstraction");
        self.controller
            .enable_abstraction(owner.clone(), self.routine.clone())
            .await?;

        tracing::info!(
            %address,
            delegate = %delegate.public_key(),
            duration = %format_duration(delegation_seconds),
            "delegating"
        );
        let grant = self
            .controller
            .delegate(owner, delegate.public_key(), delegation_seconds)
            .await?;

        tracing::info!(%address, "submitting transfer with delegated signature");
        let step = self.controller.delegated_step(
            address,
            delegate,
            Payload::Transfer {
                to: address,
                amount: TRANSFER_AMOUNT,
            },
        );
        let outcome = self
            .controller
            .orchestrator()
            .run_step::<DelegationError>(&step)
            .await?;
        let transfer = outcome
            .committed()
            .cloned()
            .ok_or(DelegationError::NoActiveDelegation(address))?;

        Ok(RunReport {
            funded,
            grant,
            transfer,
        })
    }

    /// Submit the routine's `revoke` entry for `owner`.
    ///
    /// Goes straight to the ledger: a fresh process has no local record of
    /// the grant, and revoking with nothing active is a no-op on the ledger.
    pub async fn revoke(&self, owner: &dyn TransactionSigner) -> Result<CommittedTransaction, DelegationError> {
        let payload = Payload::RevokeDelegation {
            entry: self.routine.sibling(REVOKE_FN)?,
        };
        let txn = build_signed(self.ledger.as_ref(), self.controller.factory(), owner, payload).await?;
        let committed = submit_and_confirm(self.ledger.as_ref(), &txn, self.timeout).await?;
        tracing::info!(owner = %owner.address(), hash = %committed.hash, "delegation revoked");
        Ok(committed)
    }
}
