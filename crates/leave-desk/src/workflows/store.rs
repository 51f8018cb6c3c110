//! Error vocabulary shared by every repository trait.

use crate::error::ErrorKind;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently (expected version {expected}, found {found})")]
    StaleVersion { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Conflict(_) | RepositoryError::StaleVersion { .. } => {
                ErrorKind::Conflict
            }
            RepositoryError::NotFound => ErrorKind::NotFound,
            RepositoryError::Unavailable(_) => ErrorKind::Unavailable,
        }
    }
}
