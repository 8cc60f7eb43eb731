//! Engine and flow error types

use zfm_core::StatusCode;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Engine-level errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Core protocol error
    #[error("protocol error: {0}")]
    Core(#[from] zfm_core::Error),

    /// Transport error
    #[error("transport error: {0}")]
    Transport(#[from] zfm_transport::Error),

    /// Command-record queue did not accept the entry within the
    /// insertion deadline
    #[error("command queue full")]
    QueueFull,

    /// Background tasks are gone; no recovery path
    #[error("engine stopped")]
    EngineStopped,
}

/// Outcome of a single-step flow (delete, clear, password, reads)
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The module answered with a non-success confirmation code
    #[error("device rejected the operation: {0}")]
    Rejected(StatusCode),

    /// No answer arrived within the step timeout
    #[error("timed out waiting for the device")]
    Timeout,

    /// Response payload was malformed
    #[error("bad response payload: {0}")]
    Payload(#[from] zfm_types::Error),

    #[error(transparent)]
    Engine(#[from] Error),
}

/// Outcome of an enrollment flow
#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
    /// The target location already holds a template; not retried
    #[error("location {0} is already occupied")]
    LocationOccupied(u16),

    /// All enrollment attempts were used up without a stored template
    #[error("enrollment failed after {0} attempts")]
    Failed(u32),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Outcome of a verification flow
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// All verification attempts were used up without a library match
    #[error("verification failed after {0} attempts")]
    Failed(u32),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

impl From<Error> for EnrollError {
    fn from(e: Error) -> Self {
        Self::Flow(FlowError::Engine(e))
    }
}

impl From<Error> for VerifyError {
    fn from(e: Error) -> Self {
        Self::Flow(FlowError::Engine(e))
    }
}
