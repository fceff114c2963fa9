use thiserror::Error;

/// Errors returned by engine operations. Every rejection is local: no
/// mutation has been applied when one of these comes back, and the caller
/// (normally the UI layer) decides what to show the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("exercise already belongs to a superset")]
    AlreadyGrouped,

    #[error("no such exercise, set, or group in the current session")]
    NotFound,
}

pub type EngineResult<T> = Result<T, EngineError>;
