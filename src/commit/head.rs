//! commit::head
//!
//! Resolves the current tip of a branch.
//!
//! The tip id is the concurrency token of the next commit. It is never
//! cached: every attempt resolves it immediately before compiling, and the
//! remote's own check at commit time settles the remaining race.

use std::sync::Arc;
use std::time::Duration;

use crate::core::types::{BranchName, Oid, RepoId};
use crate::forge::{Forge, ForgeError};

/// A branch and the tip it had when it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadRef {
    pub repo: RepoId,
    pub branch: BranchName,
    /// Snapshot of the branch tip; the optimistic-concurrency token.
    pub oid: Oid,
}

impl HeadRef {
    /// A head from an already-known tip, e.g. the result of a previous
    /// commit when chaining commits without re-resolving.
    pub fn new(repo: RepoId, branch: BranchName, oid: Oid) -> Self {
        Self { repo, branch, oid }
    }
}

impl std::fmt::Display for HeadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{} ({})", self.repo, self.branch, self.oid.short(7))
    }
}

/// Fetches branch tips from a forge, each call bounded by a timeout.
#[derive(Clone)]
pub struct HeadResolver {
    forge: Arc<dyn Forge>,
    timeout: Duration,
}

impl std::fmt::Debug for HeadResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadResolver")
            .field("forge", &self.forge.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HeadResolver {
    pub fn new(forge: Arc<dyn Forge>, timeout: Duration) -> Self {
        Self { forge, timeout }
    }

    /// Fetch the current tip of `branch`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the repository or branch does not exist
    /// - `AuthRequired` / `AuthFailed` if the credential cannot read it
    /// - `NetworkError` on transport failure
    /// - `Timeout` if the remote does not answer in time
    pub async fn fetch(&self, repo: &RepoId, branch: &BranchName) -> Result<HeadRef, ForgeError> {
        tracing::debug!(%repo, %branch, forge = self.forge.name(), "resolving branch head");

        let oid = tokio::time::timeout(self.timeout, self.forge.fetch_head_oid(repo, branch))
            .await
            .map_err(|_| ForgeError::Timeout(self.timeout))??;

        tracing::debug!(%repo, %branch, %oid, "resolved branch head");
        Ok(HeadRef {
            repo: repo.clone(),
            branch: branch.clone(),
            oid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge};

    fn repo() -> RepoId {
        RepoId::new("acme", "site").unwrap()
    }

    fn main_branch() -> BranchName {
        BranchName::new("main").unwrap()
    }

    #[tokio::test]
    async fn fetches_current_tip() {
        let forge =
            MockForge::new().with_branch(&repo(), &main_branch(), Oid::new("abc123").unwrap());
        let resolver = HeadResolver::new(Arc::new(forge), Duration::from_secs(5));

        let head = resolver.fetch(&repo(), &main_branch()).await.unwrap();
        assert_eq!(head.oid.as_str(), "abc123");
        assert_eq!(head.branch, main_branch());
        assert_eq!(head.repo, repo());
    }

    #[tokio::test]
    async fn never_caches() {
        let forge =
            MockForge::new().with_branch(&repo(), &main_branch(), Oid::new("abc123").unwrap());
        let resolver = HeadResolver::new(Arc::new(forge.clone()), Duration::from_secs(5));

        let first = resolver.fetch(&repo(), &main_branch()).await.unwrap();
        let moved = forge.advance_branch(&repo(), &main_branch()).unwrap();
        let second = resolver.fetch(&repo(), &main_branch()).await.unwrap();

        assert_ne!(first.oid, second.oid);
        assert_eq!(second.oid, moved);
    }

    #[tokio::test]
    async fn missing_branch_is_not_found() {
        let forge =
            MockForge::new().with_branch(&repo(), &main_branch(), Oid::new("abc123").unwrap());
        let resolver = HeadResolver::new(Arc::new(forge), Duration::from_secs(5));

        let err = resolver
            .fetch(&repo(), &BranchName::new("nope").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn auth_failure_is_surfaced() {
        let forge = MockForge::new()
            .with_branch(&repo(), &main_branch(), Oid::new("abc123").unwrap())
            .fail_on(FailOn::FetchHead(ForgeError::AuthFailed("bad credentials".into())));
        let resolver = HeadResolver::new(Arc::new(forge), Duration::from_secs(5));

        let err = resolver.fetch(&repo(), &main_branch()).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn slow_remote_times_out() {
        let forge = MockForge::new()
            .with_branch(&repo(), &main_branch(), Oid::new("abc123").unwrap())
            .with_latency(Duration::from_secs(5));
        let resolver = HeadResolver::new(Arc::new(forge), Duration::from_millis(20));

        let err = resolver.fetch(&repo(), &main_branch()).await.unwrap_err();
        assert_eq!(err, ForgeError::Timeout(Duration::from_millis(20)));
    }

    #[test]
    fn display() {
        let head = HeadRef::new(repo(), main_branch(), Oid::new("abc123def456").unwrap());
        assert_eq!(head.to_string(), "acme/site@main (abc123d)");
    }
}
