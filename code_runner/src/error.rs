use std::io;

use thiserror::Error;
use util::archive::ArchiveError;

#[derive(Debug, Error)]
pub enum GradingError {
    #[error("unsupported artifact `{0}`: only .java and .zip are accepted")]
    UnsupportedArtifact(String),
    #[error("invalid archive: {0}")]
    InvalidArchive(String),
    #[error("test cases for `{assignment_id}` are unreadable: {reason}")]
    Fixture {
        assignment_id: String,
        reason: String,
    },
    #[error("workspace i/o failed: {0}")]
    Io(#[from] io::Error),
}

impl From<ArchiveError> for GradingError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::Io(io) => GradingError::Io(io),
            other => GradingError::InvalidArchive(other.to_string()),
        }
    }
}

impl GradingError {
    /// Whether the submitter caused the failure (as opposed to the host).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            GradingError::UnsupportedArtifact(_) | GradingError::InvalidArchive(_)
        )
    }
}
