use thiserror::Error;

use crate::core::models::{ConversationId, SummaryId};

/// Unified error type for the state engine.
///
/// Variants fall into two families: user-actionable conditions that abort the
/// operation synchronously with the store unchanged, and transport failures
/// from the backend service. `is_user_actionable` distinguishes them so the
/// presentation layer can decide between an inline message and a log entry.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("A summary named \"{0}\" already exists")]
    DuplicateName(String),

    #[error("File was already uploaded. Its current name is \"{0}\"")]
    DuplicateUpload(String),

    #[error("No change has been made")]
    NoChange,

    #[error("Every row needs a validation state before requesting corrections")]
    IncompleteValidation,

    #[error("Another {0} operation is already in progress")]
    OperationInFlight(&'static str),

    #[error("Unknown summary: {0}")]
    UnknownSummary(SummaryId),

    #[error("Unknown conversation: {0}")]
    UnknownConversation(ConversationId),

    #[error("Row index {0} is out of range")]
    RowOutOfRange(usize),

    #[error("Field extraction failed: {0}")]
    Extraction(String),

    #[error("Chat stream failed: {0}")]
    ChatTransport(String),

    #[error("Assisted correction failed: {0}")]
    Assistant(String),

    #[error("Artifact deletion failed: {0}")]
    Deletion(String),

    #[error("Evaluation trigger failed: {0}")]
    Evaluation(String),

    #[error("Failed to send HTTP request: {0}")]
    Http(String),

    #[error("Failed to persist state: {0}")]
    Persistence(String),
}

impl AppError {
    /// Whether the error should be surfaced to the user as a correctable
    /// condition rather than logged as a transport failure.
    #[must_use]
    pub const fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName(_)
                | Self::DuplicateUpload(_)
                | Self::NoChange
                | Self::IncompleteValidation
                | Self::OperationInFlight(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Http(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Persistence(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Persistence(error.to_string())
    }
}
