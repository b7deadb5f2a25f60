use std::fmt;

use thiserror::Error;

/// The phase of a step that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Build,
    Submit,
    Confirm,
    Finalize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Build => "build",
            Self::Submit => "submit",
            Self::Confirm => "confirmation",
            Self::Finalize => "finalize",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError<E>
where
    E: std::error::Error + 'static,
{
    /// A single step failed.
    #[error("step {label} failed during {phase}: {cause}")]
    StepFailed {
        label: String,
        phase: Phase,
        #[source]
        cause: E,
    },

    /// A step in a sequence failed; later steps were not attempted.
    #[error("sequence aborted at step {step_index} ({label}) during {phase}: {cause}")]
    SequenceAborted {
        step_index: usize,
        label: String,
        phase: Phase,
        #[source]
        cause: E,
    },
}

impl<E> OrchestratorError<E>
where
    E: std::error::Error + 'static,
{
    pub fn cause(&self) -> &E {
        match self {
            Self::StepFailed { cause, .. } | Self::SequenceAborted { cause, .. } => cause,
        }
    }

    pub fn into_cause(self) -> E {
        match self {
            Self::StepFailed { cause, .. } | Self::SequenceAborted { cause, .. } => cause,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::StepFailed { phase, .. } | Self::SequenceAborted { phase, .. } => *phase,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::StepFailed { label, .. } | Self::SequenceAborted { label, .. } => label,
        }
    }
}
