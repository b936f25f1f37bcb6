//! commit::executor
//!
//! Submits compiled commits and reports a typed outcome.
//!
//! # Outcomes
//!
//! - [`CommitResult::Success`]: the branch advanced by one commit; the new
//!   tip is returned so sequential commits can be chained.
//! - [`CommitResult::Conflict`]: the expected head was stale. Kept apart
//!   from failures so the caller can offer refresh-and-retry only where it
//!   is safe.
//! - [`CommitResult::Failure`]: anything else (transport, auth, timeout,
//!   remote rejection).
//!
//! There is no automatic retry. The remote applies a multi-file commit
//! atomically, so no partial state is ever observable.

use std::sync::Arc;
use std::time::Duration;

use super::compile::CommitInput;
use super::error::CommitError;
use crate::core::types::Oid;
use crate::forge::{Forge, ForgeError};

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    /// The commit landed.
    Success {
        /// New branch tip
        new_oid: Oid,
    },
    /// The branch moved since the head was resolved.
    Conflict {
        /// The head the commit was built against
        stale_oid: Oid,
    },
    /// The commit did not land for any other reason.
    Failure(CommitError),
}

impl CommitResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CommitResult::Success { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CommitResult::Conflict { .. })
    }

    /// Whether re-resolving the head and resubmitting could succeed.
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// The new tip, if the commit landed.
    pub fn new_oid(&self) -> Option<&Oid> {
        match self {
            CommitResult::Success { new_oid } => Some(new_oid),
            _ => None,
        }
    }

    /// Collapse into a `Result`, a conflict becoming `ForgeError::StaleHead`.
    pub fn into_result(self) -> Result<Oid, CommitError> {
        match self {
            CommitResult::Success { new_oid } => Ok(new_oid),
            CommitResult::Conflict { stale_oid } => Err(CommitError::Forge(
                ForgeError::StaleHead {
                    expected: stale_oid,
                },
            )),
            CommitResult::Failure(err) => Err(err),
        }
    }
}

impl From<CommitError> for CommitResult {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::Forge(ForgeError::StaleHead { expected }) => CommitResult::Conflict {
                stale_oid: expected,
            },
            other => CommitResult::Failure(other),
        }
    }
}

/// Sends commit payloads to a forge.
#[derive(Clone)]
pub struct CommitExecutor {
    forge: Arc<dyn Forge>,
    timeout: Duration,
}

impl std::fmt::Debug for CommitExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitExecutor")
            .field("forge", &self.forge.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CommitExecutor {
    pub fn new(forge: Arc<dyn Forge>, timeout: Duration) -> Self {
        Self { forge, timeout }
    }

    /// Submit one commit. A single round trip, bounded by the timeout.
    pub async fn submit(&self, input: CommitInput) -> CommitResult {
        let repo = input.branch().repo();
        let branch = input.branch().branch_name();
        let expected = input.expected_head_oid();
        tracing::debug!(
            %repo,
            %branch,
            expected = %expected,
            additions = input.file_changes().additions.len(),
            deletions = input.file_changes().deletions.len(),
            "submitting commit"
        );

        let outcome = tokio::time::timeout(self.timeout, self.forge.create_commit_on_branch(&input))
            .await
            .unwrap_or(Err(ForgeError::Timeout(self.timeout)));

        let result = match outcome {
            Ok(new_oid) if &new_oid == expected => {
                CommitResult::Failure(CommitError::Forge(ForgeError::ApiError {
                    status: 200,
                    message: format!("remote reported no new commit over {}", expected),
                }))
            }
            Ok(new_oid) => CommitResult::Success { new_oid },
            Err(err) => CommitResult::from(CommitError::Forge(err)),
        };

        match &result {
            CommitResult::Success { new_oid } => {
                tracing::info!(%repo, %branch, %new_oid, "commit created")
            }
            CommitResult::Conflict { stale_oid } => {
                tracing::warn!(%repo, %branch, %stale_oid, "commit rejected: branch moved")
            }
            CommitResult::Failure(err) => {
                tracing::warn!(%repo, %branch, kind = %err.kind(), error = %err, "commit failed")
            }
        }
        result
    }
}
