use thiserror::Error;

use crate::auth::StoreError;
use crate::models::{RemoteError, AUTHENTICATE_METHOD};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed - {0}")]
    Authentication(RemoteError),

    #[error("{0}")]
    Remote(RemoteError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Credential store error: {0}")]
    Store(String),
}

impl ApiError {
    /// Classify a remote error payload by the method that produced it.
    pub fn from_remote(method: &str, error: RemoteError) -> Self {
        if method == AUTHENTICATE_METHOD {
            ApiError::Authentication(error)
        } else {
            ApiError::Remote(error)
        }
    }

    /// The server-reported payload, for authentication and remote errors.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ApiError::Authentication(e) | ApiError::Remote(e) => Some(e),
            _ => None,
        }
    }

    /// The server-reported error type, e.g. `InvalidUserException`.
    pub fn error_type(&self) -> Option<&str> {
        self.remote().and_then(RemoteError::error_type)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Status,
    Decode,
    Other,
}

/// Connectivity-level failure. Never produced for application errors.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::new(
            TransportErrorKind::Status,
            format!("Response {}: {}", status, Self::truncate_body(body)),
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportErrorKind::Timeout
        } else if e.is_connect() {
            TransportErrorKind::Connect
        } else if e.is_decode() {
            TransportErrorKind::Decode
        } else if e.is_status() {
            TransportErrorKind::Status
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, e.to_string())
    }
}
