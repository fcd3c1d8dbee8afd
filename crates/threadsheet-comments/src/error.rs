#![forbid(unsafe_code)]

//! Failure and no-op taxonomy for the comment engine.
//!
//! | Kind | Type | Handling |
//! |------|------|----------|
//! | Network failure | [`BackendError`] | logged; thread left as it was |
//! | Validation skip | [`Skip::EmptyText`] | silent no-op |
//! | Concurrency guard | [`Skip::AlreadySubmitting`], [`Skip::AlreadyLoading`], [`Skip::DeleteInFlight`] | silent no-op |
//!
//! Nothing here is fatal: every failure stops at the mutation boundary.

use std::fmt;

/// A collaborator call was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Transport-level failure (connection refused, reset, DNS).
    Network(String),
    /// The server answered with a non-success status.
    Status(u16),
    /// The response body could not be understood.
    Decode(String),
    /// No valid session.
    Unauthorized,
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network failure: {msg}"),
            Self::Status(code) => write!(f, "server returned status {code}"),
            Self::Decode(msg) => write!(f, "malformed response: {msg}"),
            Self::Unauthorized => write!(f, "not signed in"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Why a user action did not start a request.
///
/// Skips are expected outcomes, not errors: the caller logs them at debug
/// level and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// The compose text was empty after trimming.
    EmptyText,
    /// An add is already in flight on this thread.
    AlreadySubmitting,
    /// Replies for this parent are already loading.
    AlreadyLoading,
    /// A delete is already in flight.
    DeleteInFlight,
    /// Delete was requested without a prior long-press on this comment.
    NotArmed,
    /// The current user did not write this comment.
    NotOwner,
    /// No comment with this id is in the thread.
    UnknownComment,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::EmptyText => "empty text",
            Self::AlreadySubmitting => "add already in flight",
            Self::AlreadyLoading => "replies already loading",
            Self::DeleteInFlight => "delete already in flight",
            Self::NotArmed => "delete not armed",
            Self::NotOwner => "not the author",
            Self::UnknownComment => "unknown comment",
        };
        f.write_str(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        assert_eq!(BackendError::Status(503).to_string(), "server returned status 503");
        assert_eq!(BackendError::Unauthorized.to_string(), "not signed in");
    }

    #[test]
    fn decode_error_from_serde() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(matches!(BackendError::from(err), BackendError::Decode(_)));
    }
}
