use crate::types::DbId;

/// Domain errors raised by the pure stocktake and approval logic.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any edit against a closed session is refused.
    #[error("Stocktake session {session_id} is closed")]
    SessionClosed { session_id: DbId },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Export failed: {0}")]
    Export(String),
}
