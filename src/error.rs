use thiserror::Error;

use crate::phase::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RitualError {
    #[error("A ritual session is already in progress; finish or abandon it first")]
    SessionAlreadyActive,

    #[error("No ritual session is in progress")]
    NoActiveSession,

    #[error("Phase mismatch: engine is in {expected}, caller reported {actual}")]
    PhaseMismatch { expected: Phase, actual: Phase },

    #[error("Cannot {operation} during the {phase} phase")]
    InvalidPhaseForOperation {
        operation: &'static str,
        phase: Phase,
    },

    #[error("Intensity must be between 1 and 10, got {0}")]
    InvalidIntensity(u8),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<RitualError> for String {
    fn from(err: RitualError) -> Self {
        err.to_string()
    }
}

pub type RitualResult<T> = Result<T, RitualError>;
