use common::PeriodError;
use thiserror::Error;

/// Error types for the compute module
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Input rejected by a business rule
    #[error("{0}")]
    Validation(String),

    /// Row does not exist or belongs to another user
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },
}

impl ComputeError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        ComputeError::NotFound { entity, id }
    }
}

impl From<PeriodError> for ComputeError {
    fn from(error: PeriodError) -> Self {
        ComputeError::Validation(error.to_string())
    }
}

/// Type alias for Result with ComputeError
pub type Result<T> = std::result::Result<T, ComputeError>;
