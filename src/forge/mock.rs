//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge models a remote in memory: branch tips, the file tree of
//! each branch, protected branches, injected failures and artificial
//! latency. Commits are checked against the branch tip exactly like the
//! real API, so conflict handling can be tested without a network.
//!
//! New commit ids are derived from the parent, the message and the changes,
//! so identical histories produce identical ids.
//!
//! # Example
//!
//! ```
//! use gitcms::core::types::{BranchName, Oid, RepoId};
//! use gitcms::forge::mock::MockForge;
//! use gitcms::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let repo = RepoId::new("acme", "site").unwrap();
//! let main = BranchName::new("main").unwrap();
//! let forge = MockForge::new().with_branch(&repo, &main, Oid::new("abc123").unwrap());
//!
//! let tip = forge.fetch_head_oid(&repo, &main).await.unwrap();
//! assert_eq!(tip.as_str(), "abc123");
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use super::traits::{Forge, ForgeError};
use crate::commit::CommitInput;
use crate::core::types::{BranchName, Oid, RepoId};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state,
/// so a test can keep a handle while the code under test owns another.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug, Default)]
struct MockForgeInner {
    branches: HashMap<(RepoId, BranchName), BranchState>,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
    latency: Option<Duration>,
    /// Bumped on every out-of-band branch move so the ids differ.
    advances: u64,
}

#[derive(Debug, Clone, Default)]
struct BranchState {
    tip: Option<Oid>,
    files: BTreeMap<String, Vec<u8>>,
    protected: bool,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail fetch_head_oid with the given error.
    FetchHead(ForgeError),
    /// Fail create_commit_on_branch with the given error.
    CreateCommit(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    FetchHead {
        repo: RepoId,
        branch: BranchName,
    },
    CreateCommit {
        repo: RepoId,
        branch: BranchName,
        expected: Oid,
        headline: String,
        additions: Vec<String>,
        deletions: Vec<String>,
    },
}

impl MockForge {
    /// Create a new mock forge with no repositories.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a branch (and implicitly its repository) at the given tip.
    pub fn with_branch(self, repo: &RepoId, branch: &BranchName, tip: Oid) -> Self {
        {
            let mut inner = self.state();
            let state = inner
                .branches
                .entry((repo.clone(), branch.clone()))
                .or_default();
            state.tip = Some(tip);
        }
        self
    }

    /// Seed a file on an existing branch without moving its tip.
    pub fn with_file(
        self,
        repo: &RepoId,
        branch: &BranchName,
        path: &str,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        {
            let mut inner = self.state();
            let state = inner
                .branches
                .entry((repo.clone(), branch.clone()))
                .or_default();
            state.files.insert(path.to_string(), contents.into());
        }
        self
    }

    /// Mark a branch as protected: every commit to it is rejected.
    pub fn protect_branch(self, repo: &RepoId, branch: &BranchName) -> Self {
        {
            let mut inner = self.state();
            let state = inner
                .branches
                .entry((repo.clone(), branch.clone()))
                .or_default();
            state.protected = true;
        }
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = Some(latency);
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use gitcms::forge::mock::{MockForge, FailOn};
    /// use gitcms::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreateCommit(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    /// Move a branch tip as if someone else had committed to it.
    ///
    /// Returns the new tip.
    pub fn advance_branch(&self, repo: &RepoId, branch: &BranchName) -> Result<Oid, ForgeError> {
        let mut inner = self.state();
        inner.advances += 1;
        let salt = inner.advances;
        let state = inner
            .branches
            .get_mut(&(repo.clone(), branch.clone()))
            .ok_or_else(|| not_found(repo, branch))?;
        let parent = state.tip.clone().ok_or_else(|| not_found(repo, branch))?;

        let mut hasher = Sha256::new();
        hasher.update(parent.as_str());
        hasher.update(b"\0external\0");
        hasher.update(salt.to_le_bytes());
        let tip = digest_oid(hasher)?;
        state.tip = Some(tip.clone());
        Ok(tip)
    }

    /// Current tip of a branch (for test verification).
    pub fn head(&self, repo: &RepoId, branch: &BranchName) -> Option<Oid> {
        self.state()
            .branches
            .get(&(repo.clone(), branch.clone()))
            .and_then(|s| s.tip.clone())
    }

    /// Contents of a file on a branch (for test verification).
    pub fn file(&self, repo: &RepoId, branch: &BranchName, path: &str) -> Option<Vec<u8>> {
        self.state()
            .branches
            .get(&(repo.clone(), branch.clone()))
            .and_then(|s| s.files.get(path).cloned())
    }

    /// All file paths on a branch, sorted.
    pub fn files(&self, repo: &RepoId, branch: &BranchName) -> Vec<String> {
        self.state()
            .branches
            .get(&(repo.clone(), branch.clone()))
            .map(|s| s.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Number of commits the mock has been asked to create.
    pub fn commit_requests(&self) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::CreateCommit { .. }))
            .count()
    }

    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    fn check_fail(&self, expected: &str) -> Option<ForgeError> {
        match &self.state().fail_on {
            Some(FailOn::FetchHead(e)) if expected == "fetch_head" => Some(e.clone()),
            Some(FailOn::CreateCommit(e)) if expected == "create_commit" => Some(e.clone()),
            _ => None,
        }
    }

    async fn delay(&self) {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(repo: &RepoId, branch: &BranchName) -> ForgeError {
    ForgeError::NotFound(format!("branch '{}' in {}", branch, repo))
}

fn digest_oid(hasher: Sha256) -> Result<Oid, ForgeError> {
    let hex = hex::encode(hasher.finalize());
    Oid::new(&hex[..40]).map_err(|e| ForgeError::ApiError {
        status: 500,
        message: e.to_string(),
    })
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_head_oid(&self, repo: &RepoId, branch: &BranchName) -> Result<Oid, ForgeError> {
        self.record(MockOperation::FetchHead {
            repo: repo.clone(),
            branch: branch.clone(),
        });
        self.delay().await;

        if let Some(err) = self.check_fail("fetch_head") {
            return Err(err);
        }

        self.head(repo, branch)
            .ok_or_else(|| not_found(repo, branch))
    }

    async fn create_commit_on_branch(&self, input: &CommitInput) -> Result<Oid, ForgeError> {
        let repo = input.branch().repo();
        let branch = input.branch().branch_name();
        let changes = input.file_changes();
        self.record(MockOperation::CreateCommit {
            repo: repo.clone(),
            branch: branch.clone(),
            expected: input.expected_head_oid().clone(),
            headline: input.message().headline().to_string(),
            additions: changes
                .additions
                .iter()
                .map(|a| a.path.to_string())
                .collect(),
            deletions: changes
                .deletions
                .iter()
                .map(|d| d.path.to_string())
                .collect(),
        });
        self.delay().await;

        if let Some(err) = self.check_fail("create_commit") {
            return Err(err);
        }

        let mut inner = self.state();
        let state = inner
            .branches
            .get_mut(&(repo.clone(), branch.clone()))
            .ok_or_else(|| not_found(repo, branch))?;
        let tip = state.tip.clone().ok_or_else(|| not_found(repo, branch))?;

        if state.protected {
            return Err(ForgeError::RemoteRejected(format!(
                "branch '{}' is protected",
                branch
            )));
        }
        if &tip != input.expected_head_oid() {
            return Err(ForgeError::StaleHead {
                expected: input.expected_head_oid().clone(),
            });
        }

        // Stage on a copy so a rejected commit leaves the tree untouched.
        let mut files = state.files.clone();
        let mut hasher = Sha256::new();
        hasher.update(tip.as_str());
        hasher.update(input.message().to_string());

        for deletion in &changes.deletions {
            if files.remove(deletion.path.as_str()).is_none() {
                return Err(ForgeError::RemoteRejected(format!(
                    "cannot delete '{}': no such file",
                    deletion.path
                )));
            }
            hasher.update(b"\0-");
            hasher.update(deletion.path.as_str());
        }
        for addition in &changes.additions {
            let bytes = STANDARD.decode(&addition.contents).map_err(|e| {
                ForgeError::RemoteRejected(format!("'{}': invalid base64: {}", addition.path, e))
            })?;
            hasher.update(b"\0+");
            hasher.update(addition.path.as_str());
            hasher.update(&bytes);
            files.insert(addition.path.to_string(), bytes);
        }

        let new_tip = digest_oid(hasher)?;
        state.files = files;
        state.tip = Some(new_tip.clone());
        Ok(new_tip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{compile, ChangeSetBuilder, HeadRef};
    use crate::core::paths::ContentRoot;

    fn repo() -> RepoId {
        RepoId::new("acme", "site").unwrap()
    }

    fn main_branch() -> BranchName {
        BranchName::new("main").unwrap()
    }

    fn forge() -> MockForge {
        MockForge::new().with_branch(&repo(), &main_branch(), Oid::new("abc123").unwrap())
    }

    fn commit(expected: &Oid, build: impl FnOnce(&mut ChangeSetBuilder)) -> CommitInput {
        let mut b = ChangeSetBuilder::new(ContentRoot::repository());
        build(&mut b);
        let head = HeadRef::new(repo(), main_branch(), expected.clone());
        compile(b.build(), head, "test commit").unwrap()
    }

    #[tokio::test]
    async fn commit_applies_changes_and_moves_tip() {
        let forge = forge().with_file(&repo(), &main_branch(), "old.md", "bye");
        let input = commit(&Oid::new("abc123").unwrap(), |b| {
            b.add_or_replace("new.md", "hi").unwrap();
            b.delete("old.md").unwrap();
        });

        let tip = forge.create_commit_on_branch(&input).await.unwrap();

        assert_eq!(forge.head(&repo(), &main_branch()), Some(tip));
        assert_eq!(forge.file(&repo(), &main_branch(), "new.md"), Some(b"hi".to_vec()));
        assert_eq!(forge.file(&repo(), &main_branch(), "old.md"), None);
    }

    #[tokio::test]
    async fn stale_head_leaves_branch_untouched() {
        let forge = forge();
        let input = commit(&Oid::new("def456").unwrap(), |b| {
            b.add_or_replace("x.md", "x").unwrap();
        });

        let err = forge.create_commit_on_branch(&input).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(forge.head(&repo(), &main_branch()).unwrap().as_str(), "abc123");
        assert!(forge.files(&repo(), &main_branch()).is_empty());
    }

    #[tokio::test]
    async fn deleting_missing_file_is_rejected_atomically() {
        let forge = forge();
        let input = commit(&Oid::new("abc123").unwrap(), |b| {
            b.add_or_replace("kept.md", "x").unwrap();
            b.delete("missing.md").unwrap();
        });

        let err = forge.create_commit_on_branch(&input).await.unwrap_err();

        assert!(matches!(err, ForgeError::RemoteRejected(_)));
        assert_eq!(forge.file(&repo(), &main_branch(), "kept.md"), None);
    }

    #[tokio::test]
    async fn protected_branch_is_rejected() {
        let forge = forge().protect_branch(&repo(), &main_branch());
        let input = commit(&Oid::new("abc123").unwrap(), |b| {
            b.add_or_replace("x.md", "x").unwrap();
        });

        let err = forge.create_commit_on_branch(&input).await.unwrap_err();
        assert!(matches!(err, ForgeError::RemoteRejected(_)));
    }

    #[tokio::test]
    async fn unknown_repository_is_not_found() {
        let forge = forge();
        let other = RepoId::new("acme", "other").unwrap();
        let err = forge.fetch_head_oid(&other, &main_branch()).await.unwrap_err();
        assert!(matches!(err, ForgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn fail_on_hits_only_its_operation() {
        let forge = forge().fail_on(FailOn::FetchHead(ForgeError::RateLimited));
        assert_eq!(
            forge.fetch_head_oid(&repo(), &main_branch()).await,
            Err(ForgeError::RateLimited)
        );

        let input = commit(&Oid::new("abc123").unwrap(), |b| {
            b.add_or_replace("a.md", "a").unwrap();
        });
        assert!(forge.create_commit_on_branch(&input).await.is_ok());
    }

    #[tokio::test]
    async fn identical_histories_produce_identical_ids() {
        let make = || async {
            let forge = forge();
            let input = commit(&Oid::new("abc123").unwrap(), |b| {
                b.add_or_replace("a.md", "a").unwrap();
            });
            forge.create_commit_on_branch(&input).await.unwrap()
        };
        assert_eq!(make().await, make().await);
    }

    #[tokio::test]
    async fn operations_recorded() {
        let forge = forge();
        let input = commit(&Oid::new("abc123").unwrap(), |b| {
            b.add_or_replace("a.md", "a").unwrap();
        });
        forge.fetch_head_oid(&repo(), &main_branch()).await.unwrap();
        forge.create_commit_on_branch(&input).await.unwrap();

        let ops = forge.operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], MockOperation::FetchHead { .. }));
        match &ops[1] {
            MockOperation::CreateCommit {
                headline,
                additions,
                ..
            } => {
                assert_eq!(headline, "test commit");
                assert_eq!(additions, &["a.md".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(forge.commit_requests(), 1);
    }

    #[test]
    fn advance_branch_moves_tip() {
        let forge = forge();
        let first = forge.advance_branch(&repo(), &main_branch()).unwrap();
        let second = forge.advance_branch(&repo(), &main_branch()).unwrap();
        assert_ne!(first.as_str(), "abc123");
        assert_ne!(first, second);
        assert_eq!(forge.head(&repo(), &main_branch()), Some(second));
    }

    #[test]
    fn forge_name() {
        assert_eq!(MockForge::new().name(), "mock");
    }
}
