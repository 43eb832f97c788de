use reqwest::StatusCode;
use thiserror::Error;

use crate::validation::FieldErrors;

/// Failures surfaced by the backend and catalog clients.
///
/// Nothing here is retried automatically. `is_retryable` tells a caller whether
/// offering a manual "try again" makes sense.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid input: {0}")]
    Validation(FieldErrors),
    #[error("login required")]
    Unauthenticated,
    #[error("only the author can change this comment")]
    NotOwner,
    #[error("item not found in wishlist")]
    NotInWishlist,
    #[error("{0}")]
    Rejected(String),
    #[error("session storage failed: {0}")]
    Storage(#[from] StoreError),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_) | ClientError::Http { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Network(e) => e.status(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),
}
