//! forge::traits
//!
//! Forge trait definition for the remote content-addressable commit API.
//!
//! # Design
//!
//! The `Forge` trait is async because both operations involve network I/O.
//! It is deliberately narrow: one read (the branch tip) and one write (an
//! atomic multi-file commit guarded by an expected head). Everything else,
//! such as path rules, deduplication and payload shape, is settled locally
//! before a forge is called.
//!
//! # Example
//!
//! ```ignore
//! use gitcms::forge::{Forge, ForgeError};
//!
//! async fn tip(forge: &dyn Forge, repo: &RepoId, branch: &BranchName) -> Result<Oid, ForgeError> {
//!     forge.fetch_head_oid(repo, branch).await
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::commit::CommitInput;
use crate::core::types::{BranchName, Oid, RepoId};

/// Errors from forge operations.
///
/// These map the failure modes of the remote API. A stale expected head is
/// its own variant so that it can never be confused with a generic failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The repository or branch was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The branch tip no longer matches the expected head.
    #[error("branch moved: expected head {expected} is stale")]
    StaleHead {
        /// The head the commit was built against
        expected: Oid,
    },

    /// The remote refused the commit by policy or validation
    /// (protected branch, bad path, oversized payload).
    #[error("rejected by remote: {0}")]
    RemoteRejected(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The call did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ForgeError {
    /// Whether this is a concurrency conflict on the branch tip.
    pub fn is_conflict(&self) -> bool {
        matches!(self, ForgeError::StaleHead { .. })
    }

    /// Whether the credential is missing or was refused.
    pub fn is_auth(&self) -> bool {
        matches!(self, ForgeError::AuthRequired | ForgeError::AuthFailed(_))
    }
}

/// The Forge trait for the remote commit API.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: Re-authenticate
/// - `NotFound`: Repository or branch doesn't exist
/// - `StaleHead`: Someone else committed first; refetch and decide
/// - `RemoteRejected`: Display the reason to the user
/// - `NetworkError` / `Timeout`: Check connectivity
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Fetch the current tip commit id of a branch.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository or branch does not exist
    /// - `AuthFailed` if the credential lacks read access
    async fn fetch_head_oid(&self, repo: &RepoId, branch: &BranchName) -> Result<Oid, ForgeError>;

    /// Atomically create one commit on the input's branch.
    ///
    /// # Returns
    ///
    /// The id of the new branch tip.
    ///
    /// # Errors
    ///
    /// - `StaleHead` if the branch tip differs from `expectedHeadOid`
    /// - `RemoteRejected` if the remote refuses the change
    /// - `NotFound` if the repository or branch does not exist
    async fn create_commit_on_branch(&self, input: &CommitInput) -> Result<Oid, ForgeError>;
}
