//! Upload error types.

use fileshare_transfer::TransferError;

/// Errors produced while uploading.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid file: {0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error("upload incomplete: {missing} of {total} chunks missing")]
    IncompleteTransfer { missing: usize, total: usize },

    #[error("cancelled")]
    Cancelled,

    #[error("group creation failed: {0}")]
    GroupCreation(String),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),
}

/// Coarse classification of a terminal failure, one per user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    Transport,
    Server,
    IncompleteTransfer,
    Cancelled,
    GroupCreation,
    LocalIo,
}

impl UploadError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::Validation,
            Self::Transport(_) => FailureKind::Transport,
            Self::Server { .. } | Self::InvalidResponse(_) => FailureKind::Server,
            Self::IncompleteTransfer { .. } => FailureKind::IncompleteTransfer,
            Self::Cancelled => FailureKind::Cancelled,
            Self::GroupCreation(_) => FailureKind::GroupCreation,
            Self::Transfer(TransferError::EmptyFile(_) | TransferError::NotAFile(_)) => {
                FailureKind::Validation
            }
            Self::Transfer(_) => FailureKind::LocalIo,
        }
    }

    /// Transport and server failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server { .. })
    }

    /// A 4xx the request itself most likely caused. Timeouts and rate
    /// limiting are excluded.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Server { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
            _ => false,
        }
    }

    /// One human-readable line describing the failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(reason) => format!("File cannot be uploaded: {reason}."),
            Self::Transfer(TransferError::EmptyFile(name)) => {
                format!("{name} is empty and was not uploaded.")
            }
            Self::Transfer(TransferError::NotAFile(name)) => {
                format!("{name} is not a regular file.")
            }
            Self::Transfer(e) => format!("Could not read the local file: {e}."),
            Self::Transport(_) => {
                "Network error. Please check your connection and try again.".into()
            }
            Self::Server { status: 413, .. } => {
                "File too large. Please try a smaller file or use compression.".into()
            }
            Self::Server { status: 429, .. } => {
                "Too many requests. Please wait a moment and try again.".into()
            }
            Self::Server { status, .. } if *status >= 500 => {
                "Server error. Please try again later.".into()
            }
            Self::Server { status, message } if message.is_empty() => {
                format!("The server rejected the upload (status {status}).")
            }
            Self::Server { message, .. } => message.clone(),
            Self::InvalidResponse(_) => "Unexpected response from the server.".into(),
            Self::IncompleteTransfer { missing, total } => format!(
                "Upload incomplete: {missing} of {total} chunks could not be sent. Please try again."
            ),
            Self::Cancelled => "Upload cancelled.".into(),
            Self::GroupCreation(_) => {
                "Files were uploaded, but the group could not be created. Share the individual codes instead."
                    .into()
            }
        }
    }
}
