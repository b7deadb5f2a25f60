//! Transaction orchestration.
//!
//! A sequence is an ordered list of [`Step`]s. For each step the
//! [`TransactionOrchestrator`] runs `build → submit → await_confirmation`
//! and only starts the next step once the previous one has committed.
//! The first failure aborts the sequence; steps already committed stay
//! committed.

pub mod error;
pub mod orchestrator;
pub mod step;

pub use error::{OrchestratorError, Phase};
pub use orchestrator::TransactionOrchestrator;
pub use step::{Prepared, Step, StepOutcome, TransactionStep};
