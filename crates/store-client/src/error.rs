//! Store client errors.

use fileshare_protocol::LookupError;

/// Errors from the store client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Http(e)
        }
    }
}

impl Error {
    /// HTTP status of a server-side failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// `true` for connectivity failures and timeouts.
    pub fn is_transport(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::Http(e) => e.status().is_none(),
            _ => false,
        }
    }

    /// Parses the store's `{error, isGroup}` body, if any.
    pub fn lookup_error(&self) -> Option<LookupError> {
        match self {
            Error::Api { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    /// One human-readable line describing the failure.
    pub fn user_message(&self) -> String {
        match self {
            Error::Timeout => {
                "Request timed out. Please try again or try with a smaller file.".into()
            }
            Error::Http(_) => "Network error. Please check your connection and try again.".into(),
            Error::Api { status: 413, .. } => {
                "File too large. Please try a smaller file or use compression.".into()
            }
            Error::Api { status: 429, .. } => {
                "Too many requests. Please wait a moment and try again.".into()
            }
            Error::Api { status, .. } if *status >= 500 => {
                "Server error. Please try again later.".into()
            }
            Error::Api { status, .. } => match self.lookup_error() {
                Some(body) if !body.error.is_empty() => body.error,
                _ => format!("Request failed with status {status}."),
            },
            Error::Json(_) => "Unexpected response from the server.".into(),
            Error::Io(e) => format!("Could not read the local file: {e}"),
            Error::InvalidUrl(url) => format!("Invalid server address: {url}"),
        }
    }
}
