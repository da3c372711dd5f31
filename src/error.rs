use crate::cache::CacheError;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Catalog or model bootstrap failed. The engine stays uninitialized and
    /// the call may be retried.
    #[error("Initialization failed: {reason}")]
    InitializationFailed { reason: String },

    #[error("Movie not found: {movie_id}")]
    ItemNotFound { movie_id: u32 },

    /// Prediction was requested before a trained model exists. Callers must
    /// await initialization first.
    #[error("Recommendation model unavailable: engine is not initialized")]
    ModelUnavailable,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dataset import error at line {line}: {reason}")]
    Import { line: usize, reason: String },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type AppResult<T> = Result<T, AppError>;
