use thiserror::Error;

/// Failure taxonomy of the signal engine.
///
/// Every variant is scoped to a single cycle; none of them is fatal to the
/// process. A guard rejection is not an error and never shows up here: it is
/// a Hold decision carrying a note.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // -- Market data / balances ---------------------------------------------
    #[error("data unavailable: {reason}")]
    DataUnavailable { reason: String },

    #[error("insufficient history: need {required} closes, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    // -- Execution ----------------------------------------------------------
    #[error("order execution failed: {reason}")]
    ExecutionFailed { reason: String },

    // -- Configuration ------------------------------------------------------
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("exchange client setup failed: {0}")]
    ClientSetup(String),
}

impl EngineError {
    pub fn data_unavailable(reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            reason: reason.into(),
        }
    }

    pub fn client_setup(reason: impl Into<String>) -> Self {
        Self::ClientSetup(reason.into())
    }

    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }

    /// Too little history is handled exactly like a failed fetch.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable { .. } | Self::InsufficientHistory { .. }
        )
    }
}
