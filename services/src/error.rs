use code_runner::GradingError;
use db::StoreError;
use thiserror::Error;

/// Failures surfaced to callers of user-triggered operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("assignment `{0}` not found")]
    NotFound(String),
    #[error("assignment `{id}` closed {overdue} ago")]
    Expired { id: String, overdue: String },
    #[error("you already passed assignment `{0}`, no need to submit again")]
    AlreadyPassed(String),
    #[error("storage failure: {0}")]
    Store(StoreError),
    #[error("grading failure: {0}")]
    Grading(GradingError),
    #[error("external service failure: {0:#}")]
    External(anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Store(other),
        }
    }
}

impl From<GradingError> for ServiceError {
    fn from(e: GradingError) -> Self {
        if e.is_user_error() {
            ServiceError::Validation(e.to_string())
        } else {
            ServiceError::Grading(e)
        }
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::Grading(GradingError::Io(e))
    }
}

impl ServiceError {
    /// Text safe to show the user. Infrastructure detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Store(_) | ServiceError::Grading(_) | ServiceError::External(_) => {
                "Something went wrong on our side. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}
