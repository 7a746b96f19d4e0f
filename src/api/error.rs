//! Failure taxonomy for backend calls.

use thiserror::Error;

/// Errors that can occur while talking to the audiobook backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never reached the backend or never came back.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("backend rejected the request (HTTP {status})")]
    Rejected {
        status: u16,
        /// Human-readable `message` from the error payload, when present.
        message: Option<String>,
    },

    /// A success response whose body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Local file I/O (saving a download).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

impl ApiError {
    /// The backend-provided message, if the backend sent one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected {
                message: Some(m), ..
            } if !m.trim().is_empty() => Some(m.as_str()),
            _ => None,
        }
    }

    /// Text for the status banner.
    ///
    /// `operation` names what was being attempted, e.g. `"uploading file"`.
    ///
    /// ```
    /// use pdf_audiobook::api::ApiError;
    ///
    /// let e = ApiError::Rejected { status: 400, message: Some("Invalid file type.".into()) };
    /// assert_eq!(e.user_message("uploading file"), "Invalid file type.");
    ///
    /// let e = ApiError::Network("connection refused".into());
    /// assert_eq!(
    ///     e.user_message("uploading file"),
    ///     "Error uploading file: network error: connection refused"
    /// );
    /// ```
    pub fn user_message(&self, operation: &str) -> String {
        match self.backend_message() {
            Some(m) => m.to_string(),
            None => format!("Error {operation}: {self}"),
        }
    }
}
