//! Error types for the healthlog client.
//!
//! Every failure a caller can observe from a dispatch maps onto one variant
//! of [`Error`]. Transport failures (no response at all) are kept apart from
//! HTTP-level failures so callers can tell "the backend said no" from "the
//! backend never answered".

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The unified error type for healthlog operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No response was received (connection refused, DNS failure, timeout).
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// A 401 that could not be recovered through a token refresh.
    ///
    /// The session has been cleared by the time this is returned; callers
    /// should send the user back through authentication.
    #[error("session expired")]
    SessionExpired,

    /// Authenticated but not permitted (403).
    #[error("forbidden: {0}")]
    Forbidden(ApiError),

    /// The requested resource does not exist (404).
    #[error("not found: {0}")]
    NotFound(ApiError),

    /// The backend failed (5xx).
    #[error("server error: {0}")]
    Server(ApiError),

    /// Any other non-success status (400, 409, 422, ...).
    #[error("API error: {0}")]
    Api(ApiError),

    /// Login or registration was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A success response whose body was not the expected JSON.
    #[error("failed to decode response: {message}")]
    Decode { message: String },

    /// Input validation errors (bad URL, forbidden header, unknown resource).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// The session store could not persist or load state.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// Map a non-success HTTP status to its error variant.
    ///
    /// 401 is not special-cased here; the authenticated client decides what
    /// a 401 means before falling back to this mapping.
    pub fn from_status(error: ApiError) -> Self {
        match error.status {
            403 => Error::Forbidden(error),
            404 => Error::NotFound(error),
            500..=599 => Error::Server(error),
            _ => Error::Api(error),
        }
    }

    /// Returns the HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Forbidden(e) | Error::NotFound(e) | Error::Server(e) | Error::Api(e) => {
                Some(e.status)
            }
            Error::SessionExpired | Error::InvalidCredentials => Some(401),
            _ => None,
        }
    }

    /// Returns true if the caller should re-authenticate.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired)
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Any other failure before a response arrived.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// A non-success HTTP response from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Error message from the server, if the body carried one.
    pub message: Option<String>,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: u16, message: Option<String>) -> Self {
        Self { status, message }
    }

    /// Build an API error from a raw response body.
    ///
    /// The message is the first string found under `message`, `detail` or
    /// `error` in a JSON object body. Anything else yields no message.
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["message", "detail", "error"]
                    .iter()
                    .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(String::from))
            });
        Self::new(status, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// A header the caller may not set, or one that is not valid HTTP.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Unknown resource collection name.
    #[error("unknown resource '{value}'")]
    Resource { value: String },

    /// An item id that cannot be used as a single path segment.
    #[error("invalid item id '{value}': {reason}")]
    ItemId { value: String, reason: String },

    /// Generic invalid input.
    #[error("{message}")]
    Other { message: String },
}

/// Session persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the session file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The session file exists but does not hold a valid session.
    #[error("corrupt session file {}: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// The session could not be serialized.
    #[error("failed to serialize session: {message}")]
    Serialize { message: String },
}
