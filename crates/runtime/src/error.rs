//! Errors surfaced by the simulation driver.

use sim_core::{EngineError, ErrorSeverity, InvariantViolation, SetupError, SimError, SimTime};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("simulation requires {0} to be configured before building")]
    MissingComponent(&'static str),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no progress at {at}: {evaluations} evaluations without advancing time")]
    Stalled { at: SimTime, evaluations: u32 },
}

impl SimError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MissingComponent(_) => ErrorSeverity::Validation,
            Self::Setup(e) => e.severity(),
            Self::Invariant(e) => e.severity(),
            Self::Engine(e) => e.severity(),
            Self::Stalled { .. } => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingComponent(_) => "RUNTIME_MISSING_COMPONENT",
            Self::Setup(e) => e.error_code(),
            Self::Invariant(e) => e.error_code(),
            Self::Engine(e) => e.error_code(),
            Self::Stalled { .. } => "RUNTIME_STALLED",
        }
    }
}
