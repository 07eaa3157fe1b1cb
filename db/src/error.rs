use sea_orm::DbErr;
use thiserror::Error;

/// Failures of the Entity Store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("assignment `{0}` not found")]
    NotFound(String),
    #[error("assignment `{0}` already exists")]
    AlreadyExists(String),
    #[error("the deadline of assignment `{0}` cannot be changed")]
    DeadlineChanged(String),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}
