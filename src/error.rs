use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Narrative unavailable: {0}")]
    Narrative(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl AppError {
    /// Whether this error should fail the task that produced it.
    ///
    /// Narrative and cache failures degrade gracefully; everything else
    /// is a hard failure for the security being processed.
    pub fn is_soft(&self) -> bool {
        matches!(self, AppError::Narrative(_) | AppError::Cache(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
