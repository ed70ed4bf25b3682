use document_service_filters::FilterError;
use thiserror::Error;

use crate::document::validate::ValidationError;
use crate::middleware::Action;
use crate::repository::RepoError;

/// Error type surfaced by every facade operation.
///
/// Transport collaborators map these categories to their own status codes;
/// missing documents are never errors and come back as `None` instead.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid filters: {0}")]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Repository(#[from] RepoError),

    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown content type: {0}")]
    UnknownContentType(String),

    #[error("middleware aborted {action}: {message}")]
    Middleware { action: Action, message: String },

    #[error("middleware returned an unexpected result for {action}")]
    UnexpectedOutcome { action: Action },
}

impl DocumentError {
    /// Convenience constructor for interceptors that reject a call.
    pub fn middleware(action: Action, message: impl Into<String>) -> Self {
        DocumentError::Middleware {
            action,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DocumentError::Validation(_) | DocumentError::Filter(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DocumentError::Repository(RepoError::UniqueConstraint { .. })
        )
    }
}

/// Convenience type alias for facade results.
pub type DocumentResult<T> = Result<T, DocumentError>;
