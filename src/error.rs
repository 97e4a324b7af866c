//! Domain errors surfaced to the user
//!
//! Every failure of a user-triggered action ends up as one of these and is
//! shown once as a notice. None of them escape the App layer.

use thiserror::Error;

use crate::models::{RecordId, ResourceKind};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsoleError {
    /// Server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Request never produced a response (connect/timeout/body read)
    #[error("Request failed: {0}")]
    Transport(String),

    /// Success status but the body could not be understood
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Required input missing or malformed; detected before any request
    #[error("{0}")]
    Validation(String),

    /// Selected row no longer exists in the cached collection
    #[error("{kind} #{id} is no longer loaded, reload and select again")]
    StaleReference { kind: ResourceKind, id: RecordId },

    /// Local file could not be read or written
    #[error("File error: {0}")]
    Io(String),
}

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        ConsoleError::Validation(message.into())
    }

    /// Status code of the failed request, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ConsoleError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ConsoleError::Transport("request timed out".to_string())
        } else if e.is_connect() {
            ConsoleError::Transport(format!("connection failed: {}", e))
        } else if e.is_decode() {
            ConsoleError::Decode(e.to_string())
        } else {
            ConsoleError::Transport(e.to_string())
        }
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(e: std::io::Error) -> Self {
        ConsoleError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_format() {
        let err = ConsoleError::Status {
            status: 404,
            message: "Group not found".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: Group not found");
        assert_eq!(err.status(), Some(404));
        assert_eq!(ConsoleError::validation("x").status(), None);
    }

    #[test]
    fn test_stale_reference_names_record() {
        let err = ConsoleError::StaleReference {
            kind: ResourceKind::Teacher,
            id: 7,
        };
        assert!(err.to_string().starts_with("Teachers #7"));
    }
}
