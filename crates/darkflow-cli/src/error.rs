use darkflow_core::PipelineError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] darkflow_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error("no symbol produced a result ({attempted} attempted)")]
    EmptyRun { attempted: usize },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::EmptyRun { .. } => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::EmptyRunResult { attempted, skipped } => {
                for entry in &skipped {
                    tracing::warn!(symbol = %entry.symbol, reason = %entry.reason, "no result");
                }
                Self::EmptyRun { attempted }
            }
            PipelineError::Validation(error) => Self::Validation(error),
        }
    }
}
