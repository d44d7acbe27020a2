use itam_client::error::ClientError;
use itam_core::error::CoreError;

/// Error type for workflow controller operations.
///
/// Every failure is also reported as a [`crate::notice::Notice`]; this type
/// is what callers branch on.
#[derive(Debug, thiserror::Error)]
pub enum StocktakeError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backend call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The wizard cannot advance yet.
    #[error("Not ready: {0}")]
    NotReady(String),
}

pub type StocktakeResult<T> = Result<T, StocktakeError>;
