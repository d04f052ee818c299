use thiserror::Error;

use crate::remote::RemoteError;

/// Failures while writing one of the persisted documents.
///
/// Read failures never surface here: an unreadable document is treated as
/// absent and replaced by its empty default.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Why a synchronization attempt for one chat did not commit.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Listing or history call failed; re-invoke the operation to retry.
    #[error("remote failure: {0}")]
    Remote(#[from] RemoteError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Remote(_) | SyncError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
