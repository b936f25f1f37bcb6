//! commit::attempt
//!
//! One observable commit attempt: resolve the head, compile, submit.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Resolving -> Compiling { head } -> Submitting { expected }
//!      -> Succeeded { new_oid } | Conflicted { stale_oid } | Failed { error }
//! ```
//!
//! `Idle -> Compiling` is also allowed when the caller already knows the tip,
//! e.g. the new oid of the previous commit. `Idle -> Failed` happens when
//! [`CommitAttempt::run`] refuses a change set before touching the remote.
//! Resolving and compiling may fail straight to `Failed`. Terminal states are final: an attempt is never
//! reused, and retrying after a conflict means starting a new attempt.
//!
//! Every transition is logged and reported to the registered
//! [`AttemptObserver`]s.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use gitcms::commit::{ChangeSetBuilder, CommitAttempt, CommitResult};
//! use gitcms::core::paths::ContentRoot;
//! use gitcms::core::types::{BranchName, Oid, RepoId};
//! use gitcms::forge::mock::MockForge;
//!
//! # tokio_test::block_on(async {
//! let repo = RepoId::new("acme", "site").unwrap();
//! let main = BranchName::new("main").unwrap();
//! let forge = MockForge::new().with_branch(&repo, &main, Oid::new("abc123").unwrap());
//!
//! let mut builder = ChangeSetBuilder::new(ContentRoot::repository());
//! builder.add_or_replace("content/posts/.gitkeep", "").unwrap();
//!
//! let result = CommitAttempt::new(Arc::new(forge), Duration::from_secs(5))
//!     .run(builder.build(), &repo, &main, "feat(content): create posts")
//!     .await
//!     .unwrap();
//! assert!(result.is_success());
//! # });
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use super::change_set::ChangeSet;
use super::compile::{CommitInput, Compiler};
use super::error::CommitError;
use super::executor::{CommitExecutor, CommitResult};
use super::head::{HeadRef, HeadResolver};
use super::observer::AttemptObserver;
use crate::core::types::{BranchName, Oid, RepoId};
use crate::forge::Forge;

/// Unique identifier for an attempt, used to correlate log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttemptId(String);

impl AttemptId {
    /// Generate a new unique attempt id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an attempt is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    /// Created, nothing done yet.
    Idle,
    /// Fetching the branch tip.
    Resolving,
    /// Head known, building the payload.
    Compiling { head: HeadRef },
    /// Payload sent, waiting for the remote.
    Submitting { expected: Oid },
    /// The commit landed.
    Succeeded { new_oid: Oid },
    /// The head was stale.
    Conflicted { stale_oid: Oid },
    /// Anything else went wrong.
    Failed { error: CommitError },
}

impl AttemptState {
    /// Short name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            AttemptState::Idle => "idle",
            AttemptState::Resolving => "resolving",
            AttemptState::Compiling { .. } => "compiling",
            AttemptState::Submitting { .. } => "submitting",
            AttemptState::Succeeded { .. } => "succeeded",
            AttemptState::Conflicted { .. } => "conflicted",
            AttemptState::Failed { .. } => "failed",
        }
    }

    /// Check if the attempt is over.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Succeeded { .. }
                | AttemptState::Conflicted { .. }
                | AttemptState::Failed { .. }
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: &AttemptState) -> bool {
        use AttemptState::*;
        matches!(
            (self, next),
            (Idle, Resolving)
                | (Idle, Compiling { .. })
                | (Idle, Failed { .. })
                | (Resolving, Compiling { .. })
                | (Resolving, Failed { .. })
                | (Compiling { .. }, Submitting { .. })
                | (Compiling { .. }, Failed { .. })
                | (Submitting { .. }, Succeeded { .. })
                | (Submitting { .. }, Conflicted { .. })
                | (Submitting { .. }, Failed { .. })
        )
    }

    /// The outcome of a terminal state.
    pub fn outcome(&self) -> Option<CommitResult> {
        match self {
            AttemptState::Succeeded { new_oid } => Some(CommitResult::Success {
                new_oid: new_oid.clone(),
            }),
            AttemptState::Conflicted { stale_oid } => Some(CommitResult::Conflict {
                stale_oid: stale_oid.clone(),
            }),
            AttemptState::Failed { error } => Some(CommitResult::Failure(error.clone())),
            _ => None,
        }
    }
}

impl From<CommitResult> for AttemptState {
    fn from(result: CommitResult) -> Self {
        match result {
            CommitResult::Success { new_oid } => AttemptState::Succeeded { new_oid },
            CommitResult::Conflict { stale_oid } => AttemptState::Conflicted { stale_oid },
            CommitResult::Failure(error) => AttemptState::Failed { error },
        }
    }
}

/// A step was invoked out of order.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("illegal attempt transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// One commit attempt.
pub struct CommitAttempt {
    id: AttemptId,
    state: AttemptState,
    resolver: HeadResolver,
    compiler: Compiler,
    executor: CommitExecutor,
    observers: Vec<Arc<dyn AttemptObserver>>,
    /// Payload between `Compiling` and `Submitting`.
    pending: Option<CommitInput>,
}

impl std::fmt::Debug for CommitAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitAttempt")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl CommitAttempt {
    /// A fresh attempt; every network call is bounded by `timeout`.
    pub fn new(forge: Arc<dyn Forge>, timeout: Duration) -> Self {
        Self {
            id: AttemptId::new(),
            state: AttemptState::Idle,
            resolver: HeadResolver::new(forge.clone(), timeout),
            compiler: Compiler::default(),
            executor: CommitExecutor::new(forge, timeout),
            observers: Vec::new(),
            pending: None,
        }
    }

    /// Use a compiler with custom limits.
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Register an observer of state transitions.
    pub fn observe(mut self, observer: Arc<dyn AttemptObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn id(&self) -> &AttemptId {
        &self.id
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    fn enter(&mut self, next: AttemptState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(&next) {
            return Err(TransitionError {
                from: self.state.name(),
                to: next.name(),
            });
        }
        tracing::debug!(
            attempt_id = %self.id,
            from = self.state.name(),
            to = next.name(),
            "attempt transition"
        );
        self.state = next;
        for observer in &self.observers {
            observer.on_transition(&self.id, &self.state);
        }
        Ok(())
    }

    /// Resolve the branch tip. On failure the attempt is `Failed`.
    pub async fn resolve(
        &mut self,
        repo: &RepoId,
        branch: &BranchName,
    ) -> Result<&AttemptState, TransitionError> {
        self.enter(AttemptState::Resolving)?;
        let next = match self.resolver.fetch(repo, branch).await {
            Ok(head) => AttemptState::Compiling { head },
            Err(e) => AttemptState::Failed {
                error: CommitError::Forge(e),
            },
        };
        self.enter(next)?;
        Ok(&self.state)
    }

    /// Skip resolving and build against a known tip.
    pub fn start_at(&mut self, head: HeadRef) -> Result<&AttemptState, TransitionError> {
        self.enter(AttemptState::Compiling { head })?;
        Ok(&self.state)
    }

    /// Compile the change set against the resolved head. A validation
    /// failure moves the attempt to `Failed` before any commit is sent.
    pub fn compile(
        &mut self,
        change_set: ChangeSet,
        message: &str,
    ) -> Result<&AttemptState, TransitionError> {
        let head = match &self.state {
            AttemptState::Compiling { head } => head.clone(),
            other => {
                return Err(TransitionError {
                    from: other.name(),
                    to: "submitting",
                })
            }
        };

        let next = match self.compiler.compile(change_set, head, message) {
            Ok(input) => {
                let expected = input.expected_head_oid().clone();
                self.pending = Some(input);
                AttemptState::Submitting { expected }
            }
            Err(e) => AttemptState::Failed {
                error: CommitError::Validation(e),
            },
        };
        self.enter(next)?;
        Ok(&self.state)
    }

    /// Send the compiled commit and record the outcome.
    pub async fn submit(&mut self) -> Result<&AttemptState, TransitionError> {
        let input = match (&self.state, self.pending.take()) {
            (AttemptState::Submitting { .. }, Some(input)) => input,
            (other, _) => {
                return Err(TransitionError {
                    from: other.name(),
                    to: "succeeded",
                })
            }
        };

        let result = self.executor.submit(input).await;
        self.enter(AttemptState::from(result))?;
        Ok(&self.state)
    }

    /// Check the change set before any network call. Returns `false` and
    /// leaves the attempt `Failed` if it cannot be committed.
    fn preflight(&mut self, change_set: &ChangeSet) -> Result<bool, TransitionError> {
        match self.compiler.preflight(change_set) {
            Ok(()) => Ok(true),
            Err(e) => {
                self.enter(AttemptState::Failed {
                    error: CommitError::Validation(e),
                })?;
                Ok(false)
            }
        }
    }

    /// Run the whole chain for a change set and return its outcome.
    ///
    /// The change set is checked first: an empty or oversized set fails the
    /// attempt without a head query or a commit. The attempt is consumed.
    pub async fn run(
        mut self,
        change_set: ChangeSet,
        repo: &RepoId,
        branch: &BranchName,
        message: &str,
    ) -> Result<CommitResult, TransitionError> {
        let span = tracing::info_span!("commit_attempt", attempt_id = %self.id, %repo, %branch);
        async {
            if self.preflight(&change_set)? {
                self.resolve(repo, branch).await?;
            }
            self.finish(change_set, message).await
        }
        .instrument(span)
        .await
    }

    /// Like [`run`](Self::run), against an already-known head.
    pub async fn run_at(
        mut self,
        change_set: ChangeSet,
        head: HeadRef,
        message: &str,
    ) -> Result<CommitResult, TransitionError> {
        if self.preflight(&change_set)? {
            self.start_at(head)?;
        }
        self.finish(change_set, message).await
    }

    async fn finish(
        &mut self,
        change_set: ChangeSet,
        message: &str,
    ) -> Result<CommitResult, TransitionError> {
        if !self.state.is_terminal() {
            self.compile(change_set, message)?;
        }
        if !self.state.is_terminal() {
            self.submit().await?;
        }
        self.state.outcome().ok_or(TransitionError {
            from: self.state.name(),
            to: "terminal",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{ChangeSetBuilder, ErrorKind, UnsavedChanges, ValidationError};
    use crate::core::paths::ContentRoot;
    use crate::forge::mock::{FailOn, MockForge};
    use crate::forge::ForgeError;
    use std::sync::Mutex;

    fn repo() -> RepoId {
        RepoId::new("acme", "site").unwrap()
    }

    fn main_branch() -> BranchName {
        BranchName::new("main").unwrap()
    }

    fn forge() -> MockForge {
        MockForge::new().with_branch(&repo(), &main_branch(), Oid::new("abc123").unwrap())
    }

    fn change_set() -> ChangeSet {
        let mut b = ChangeSetBuilder::new(ContentRoot::repository());
        b.add_or_replace("content/posts/.gitkeep", "").unwrap();
        b.build()
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<&'static str>>);

    impl AttemptObserver for Recorder {
        fn on_transition(&self, _attempt: &AttemptId, state: &AttemptState) {
            self.0.lock().unwrap().push(state.name());
        }
    }

    #[tokio::test]
    async fn successful_run_walks_the_lifecycle() {
        let recorder = Arc::new(Recorder::default());
        let result = CommitAttempt::new(Arc::new(forge()), Duration::from_secs(5))
            .observe(recorder.clone())
            .run(change_set(), &repo(), &main_branch(), "feat(content): create posts")
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(
            *recorder.0.lock().unwrap(),
            ["resolving", "compiling", "submitting", "succeeded"]
        );
    }

    #[tokio::test]
    async fn out_of_band_commit_is_conflict() {
        let forge = forge();
        let mut attempt = CommitAttempt::new(Arc::new(forge.clone()), Duration::from_secs(5));
        attempt.resolve(&repo(), &main_branch()).await.unwrap();
        forge.advance_branch(&repo(), &main_branch()).unwrap();
        attempt.compile(change_set(), "msg").unwrap();
        let state = attempt.submit().await.unwrap();

        assert_eq!(
            state,
            &AttemptState::Conflicted {
                stale_oid: Oid::new("abc123").unwrap()
            }
        );
    }

    #[tokio::test]
    async fn resolve_failure_ends_in_failed() {
        let forge = forge().fail_on(FailOn::FetchHead(ForgeError::AuthRequired));
        let result = CommitAttempt::new(Arc::new(forge.clone()), Duration::from_secs(5))
            .run(change_set(), &repo(), &main_branch(), "msg")
            .await
            .unwrap();

        match result {
            CommitResult::Failure(e) => assert_eq!(e.kind(), ErrorKind::Auth),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(forge.commit_requests(), 0);
    }

    #[tokio::test]
    async fn empty_change_set_fails_before_any_request() {
        let forge = forge();
        let recorder = Arc::new(Recorder::default());
        let empty = ChangeSetBuilder::new(ContentRoot::repository()).build();
        let result = CommitAttempt::new(Arc::new(forge.clone()), Duration::from_secs(5))
            .observe(recorder.clone())
            .run(empty, &repo(), &main_branch(), "msg")
            .await
            .unwrap();

        assert_eq!(
            result,
            CommitResult::Failure(CommitError::Validation(ValidationError::EmptyChangeSet))
        );
        assert!(forge.operations().is_empty());
        assert_eq!(*recorder.0.lock().unwrap(), ["failed"]);
    }

    #[tokio::test]
    async fn oversized_file_fails_before_head_query() {
        let forge = forge();
        let mut b = ChangeSetBuilder::new(ContentRoot::repository());
        b.add_or_replace_bytes("content/big.bin", &[0u8; 64]).unwrap();
        let result = CommitAttempt::new(Arc::new(forge.clone()), Duration::from_secs(5))
            .with_compiler(Compiler::new(32))
            .run(b.build(), &repo(), &main_branch(), "msg")
            .await
            .unwrap();

        match result {
            CommitResult::Failure(e) => assert_eq!(e.kind(), ErrorKind::Validation),
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn unreachable_remote_does_not_mask_validation() {
        let forge = forge().fail_on(FailOn::FetchHead(ForgeError::AuthRequired));
        let empty = ChangeSetBuilder::new(ContentRoot::repository()).build();
        let result = CommitAttempt::new(Arc::new(forge.clone()), Duration::from_secs(5))
            .run(empty, &repo(), &main_branch(), "msg")
            .await
            .unwrap();

        match result {
            CommitResult::Failure(e) => assert_eq!(e.kind(), ErrorKind::Validation),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn steps_out_of_order_are_refused() {
        let mut attempt = CommitAttempt::new(Arc::new(forge()), Duration::from_secs(5));

        let err = attempt.submit().await.unwrap_err();
        assert_eq!(err.from, "idle");

        let err = attempt.compile(change_set(), "msg").unwrap_err();
        assert_eq!(err.from, "idle");
        assert_eq!(attempt.state(), &AttemptState::Idle);
    }

    #[tokio::test]
    async fn terminal_attempt_cannot_restart() {
        let mut attempt = CommitAttempt::new(Arc::new(forge()), Duration::from_secs(5));
        attempt.resolve(&repo(), &main_branch()).await.unwrap();
        attempt.compile(change_set(), "msg").unwrap();
        attempt.submit().await.unwrap();
        assert!(attempt.state().is_terminal());

        let err = attempt.resolve(&repo(), &main_branch()).await.unwrap_err();
        assert_eq!(err.from, "succeeded");
    }

    #[tokio::test]
    async fn run_at_chains_from_known_head() {
        let forge = forge();
        let first = CommitAttempt::new(Arc::new(forge.clone()), Duration::from_secs(5))
            .run(change_set(), &repo(), &main_branch(), "first")
            .await
            .unwrap()
            .into_result()
            .unwrap();

        let mut b = ChangeSetBuilder::new(ContentRoot::repository());
        b.add_or_replace("content/posts/hello.md", "hi").unwrap();
        let head = HeadRef::new(repo(), main_branch(), first.clone());
        let second = CommitAttempt::new(Arc::new(forge.clone()), Duration::from_secs(5))
            .run_at(b.build(), head, "second")
            .await
            .unwrap();

        assert!(second.is_success());
        assert_ne!(second.new_oid(), Some(&first));
        // Only the initial attempt resolved the head.
        let fetches = forge
            .operations()
            .iter()
            .filter(|op| matches!(op, crate::forge::mock::MockOperation::FetchHead { .. }))
            .count();
        assert_eq!(fetches, 1);
    }

    #[tokio::test]
    async fn unsaved_changes_cleared_only_on_success() {
        let unsaved = UnsavedChanges::new();
        unsaved.mark_dirty();

        let stale_forge = forge();
        let mut attempt = CommitAttempt::new(Arc::new(stale_forge.clone()), Duration::from_secs(5))
            .observe(Arc::new(unsaved.clone()));
        attempt.resolve(&repo(), &main_branch()).await.unwrap();
        stale_forge.advance_branch(&repo(), &main_branch()).unwrap();
        attempt.compile(change_set(), "msg").unwrap();
        attempt.submit().await.unwrap();
        assert!(unsaved.is_dirty());

        CommitAttempt::new(Arc::new(forge()), Duration::from_secs(5))
            .observe(Arc::new(unsaved.clone()))
            .run(change_set(), &repo(), &main_branch(), "msg")
            .await
            .unwrap();
        assert!(!unsaved.is_dirty());
    }

    #[test]
    fn transition_table() {
        let head = HeadRef::new(repo(), main_branch(), Oid::new("abc123").unwrap());
        let oid = Oid::new("abc123").unwrap();
        let failed = AttemptState::Failed {
            error: CommitError::Validation(ValidationError::EmptyChangeSet),
        };

        assert!(AttemptState::Idle.can_transition_to(&AttemptState::Resolving));
        assert!(AttemptState::Resolving.can_transition_to(&failed));
        assert!(AttemptState::Idle.can_transition_to(&failed));
        assert!(!AttemptState::Idle.can_transition_to(&AttemptState::Submitting {
            expected: oid.clone()
        }));
        assert!(AttemptState::Compiling { head }.can_transition_to(&AttemptState::Submitting {
            expected: oid.clone()
        }));
        assert!(!AttemptState::Succeeded {
            new_oid: oid.clone()
        }
        .can_transition_to(&AttemptState::Resolving));
        assert!(!failed.can_transition_to(&AttemptState::Idle));
    }

    #[test]
    fn attempt_ids_are_unique() {
        assert_ne!(AttemptId::new(), AttemptId::new());
    }
}
