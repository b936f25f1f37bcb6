//! commit::error
//!
//! Error taxonomy for commit attempts.
//!
//! Local validation failures ([`ValidationError`]) are raised synchronously
//! before any network call. Remote failures arrive as
//! [`ForgeError`](crate::forge::ForgeError). [`CommitError`] unifies the two
//! and [`ErrorKind`] flattens them into the categories a caller branches on.

use thiserror::Error;

use crate::core::paths::{PathError, RepoPath};
use crate::forge::ForgeError;

/// A change set or payload that must not be sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A commit with no file changes.
    #[error("change set is empty: a commit needs at least one file change")]
    EmptyChangeSet,

    /// A path that is malformed or escapes the content root.
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    /// A file larger than the configured limit.
    #[error("'{path}' is {size} bytes, over the {limit} byte limit")]
    ContentTooLarge {
        path: RepoPath,
        size: u64,
        limit: u64,
    },

    /// Content declared as base64 that does not decode.
    #[error("'{path}' is not valid base64: {reason}")]
    InvalidEncoding { path: RepoPath, reason: String },
}

/// Any failure of a commit attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Forge(#[from] ForgeError),
}

/// Failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Repository or branch missing
    NotFound,
    /// Credential missing, invalid or expired
    Auth,
    /// Stale expected head
    Conflict,
    /// Refused locally before any network call
    Validation,
    /// Transport failure
    Network,
    /// A network call exceeded its bound
    Timeout,
    /// Refused by the remote (protected branch, policy)
    RemoteRejected,
    /// Remote rate limit
    RateLimited,
    /// Any other remote error
    Api,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::Auth => "auth",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RemoteRejected => "remote-rejected",
            ErrorKind::RateLimited => "rate-limited",
            ErrorKind::Api => "api",
        };
        write!(f, "{}", s)
    }
}

impl CommitError {
    /// Categorize this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommitError::Validation(_) => ErrorKind::Validation,
            CommitError::Forge(e) => match e {
                ForgeError::AuthRequired | ForgeError::AuthFailed(_) => ErrorKind::Auth,
                ForgeError::NotFound(_) => ErrorKind::NotFound,
                ForgeError::RateLimited => ErrorKind::RateLimited,
                ForgeError::StaleHead { .. } => ErrorKind::Conflict,
                ForgeError::RemoteRejected(_) => ErrorKind::RemoteRejected,
                ForgeError::ApiError { .. } => ErrorKind::Api,
                ForgeError::NetworkError(_) => ErrorKind::Network,
                ForgeError::Timeout(_) => ErrorKind::Timeout,
            },
        }
    }

    /// Whether this is a stale-head conflict.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}
