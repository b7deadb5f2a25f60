//! The sequence driver.

use std::sync::Arc;
use std::time::Duration;

use aegis_ledger::{CommittedTransaction, LedgerClient, LedgerError, SignedTransaction};

use crate::error::{OrchestratorError, Phase};
use crate::step::{Prepared, Step, StepOutcome};

/// Runs steps against one ledger, one at a time.
#[derive(Clone)]
pub struct TransactionOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    confirmation_timeout: Duration,
}

impl TransactionOrchestrator {
    pub fn new(ledger: Arc<dyn LedgerClient>, confirmation_timeout: Duration) -> Self {
        Self {
            ledger,
            confirmation_timeout,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub fn confirmation_timeout(&self) -> Duration {
        self.confirmation_timeout
    }

    /// Run `steps` in order, each to commit before the next starts.
    ///
    /// Returns one outcome per step, in step order. On failure no further
    /// step is built and nothing is rolled back.
    pub async fn run_sequence<E>(
        &self,
        steps: &[Box<dyn Step<Error = E>>],
    ) -> Result<Vec<StepOutcome>, OrchestratorError<E>>
    where
        E: std::error::Error + From<LedgerError> + Send + Sync + 'static,
    {
        let mut outcomes = Vec::with_capacity(steps.len());
        for (step_index, step) in steps.iter().enumerate() {
            match self.run_step(step.as_ref()).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    let phase = err.phase();
                    let label = err.label().to_string();
                    tracing::warn!(step_index, %label, %phase, "sequence aborted");
                    return Err(OrchestratorError::SequenceAborted {
                        step_index,
                        label,
                        phase,
                        cause: err.into_cause(),
                    });
                }
            }
        }
        Ok(outcomes)
    }

    /// Run a single step through all of its phases.
    pub async fn run_step<E>(&self, step: &dyn Step<Error = E>) -> Result<StepOutcome, OrchestratorError<E>>
    where
        E: std::error::Error + From<LedgerError> + Send + Sync + 'static,
    {
        let label = step.label();
        let fail = |phase: Phase| {
            let label = label.clone();
            move |cause: E| OrchestratorError::StepFailed { label, phase, cause }
        };

        let ledger = self.ledger.as_ref();
        let txn = match step.build(ledger).await.map_err(fail(Phase::Build))? {
            Prepared::Submit(txn) => txn,
            Prepared::Skip => {
                tracing::debug!(step = %label, "nothing to submit");
                return Ok(StepOutcome::Skipped);
            }
        };

        let committed = match self.commit(step, &txn).await {
            Ok(committed) => committed,
            Err((phase, cause)) => {
                step.abort();
                return Err(fail(phase)(cause));
            }
        };

        tracing::info!(step = %label, hash = %committed.hash, version = committed.version, "step committed");
        Ok(StepOutcome::Committed(committed))
    }

    async fn commit<E>(
        &self,
        step: &dyn Step<Error = E>,
        txn: &SignedTransaction,
    ) -> Result<CommittedTransaction, (Phase, E)>
    where
        E: std::error::Error + From<LedgerError> + Send + Sync + 'static,
    {
        let ledger = self.ledger.as_ref();
        let pending = step.submit(ledger, txn).await.map_err(|e| (Phase::Submit, e))?;
        let committed = step
            .await_confirmation(ledger, &pending, self.confirmation_timeout)
            .await
            .map_err(|e| (Phase::Confirm, e))?;
        step.finalize(&committed).await.map_err(|e| (Phase::Finalize, e))?;
        Ok(committed)
    }
}
