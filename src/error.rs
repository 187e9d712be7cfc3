//! Unified error type.
//!
//! Everything that travels through [`Next::fail`](crate::Next::fail) is an
//! [`Error`]. A routing miss is *not* an error: it is the dispatch loop running
//! out of layers, answered with 404 by the application's final responder.

use std::io;

use http::StatusCode;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type carried by the error continuation.
///
/// Every variant maps to an HTTP status via [`Error::status`]; that status is
/// what the final responder sends when no error-handling layer answers first.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// File or socket I/O failed (static serving, `send_file`, binding).
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// An error that already knows its HTTP status.
    #[error("{status}: {message}")]
    Http { status: StatusCode, message: String },

    /// `Response::format` found no offered type acceptable to the client.
    #[error("not acceptable, offered {types:?}")]
    NotAcceptable { types: Vec<String> },

    /// A terminal operation ran on a response that was already committed.
    #[error("response already sent")]
    HeadersSent,

    /// A route pattern could not be compiled.
    #[error("invalid route `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: &'static str },

    /// JSON serialization failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Settings could not be parsed.
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    /// Anything else a handler wants to fail with.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// An error with an explicit status and a message that is safe to show.
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http { status, message: message.into() }
    }

    /// Shorthand for `404 Not Found`.
    pub fn not_found() -> Self {
        Self::http(StatusCode::NOT_FOUND, "Not Found")
    }

    /// Wraps an arbitrary error; it surfaces as `500`.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }

    /// The HTTP status the final responder uses for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Io(e) => match e.kind() {
                io::ErrorKind::NotFound
                | io::ErrorKind::NotADirectory
                | io::ErrorKind::IsADirectory => StatusCode::NOT_FOUND,
                io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Http { status, .. } => *status,
            Self::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::HeadersSent
            | Self::Pattern { .. }
            | Self::Json(_)
            | Self::Config(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `true` for client-side (4xx) failures.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_http_statuses() {
        let missing = Error::from(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let denied = Error::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        let other = Error::from(io::Error::other("disk on fire"));
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn negotiation_failure_is_406() {
        let err = Error::NotAcceptable { types: vec!["application/json".into()] };
        assert_eq!(err.status(), StatusCode::NOT_ACCEPTABLE);
        assert!(err.is_client_error());
    }
}
