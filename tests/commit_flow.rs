//! End-to-end commit flows against the in-memory forge.
//!
//! Each test drives a full attempt: resolve the head, build a change set
//! through a content intent, compile and submit.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gitcms::commit::{
    AttemptId, AttemptObserver, AttemptState, ChangeSetBuilder, CommitAttempt, CommitResult,
    Compiler, ErrorKind, HeadRef, HeadResolver, UnsavedChanges,
};
use gitcms::content;
use gitcms::core::paths::ContentRoot;
use gitcms::core::types::{BranchName, Oid, RepoId};
use gitcms::forge::mock::{FailOn, MockForge, MockOperation};
use gitcms::forge::ForgeError;

const TIMEOUT: Duration = Duration::from_secs(5);

fn repo() -> RepoId {
    RepoId::new("acme", "site").unwrap()
}

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

fn forge() -> MockForge {
    MockForge::new().with_branch(&repo(), &main_branch(), Oid::new("abc123").unwrap())
}

#[derive(Default)]
struct Recorder(Mutex<Vec<&'static str>>);

impl AttemptObserver for Recorder {
    fn on_transition(&self, _attempt: &AttemptId, state: &AttemptState) {
        self.0.lock().unwrap().push(state.name());
    }
}

#[tokio::test]
async fn create_collection_commits_keep_file() {
    let forge = forge();
    let mut builder = ChangeSetBuilder::new(ContentRoot::new(None, "content").unwrap());
    let message = content::create_collection(&mut builder, "posts", &["docs"]).unwrap();
    assert_eq!(message, "feat(content): create posts");

    let result = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .run(builder.build(), &repo(), &main_branch(), &message)
        .await
        .unwrap();

    let new_oid = result.new_oid().cloned().expect("commit should land");
    assert_ne!(new_oid.as_str(), "abc123");
    assert_eq!(forge.head(&repo(), &main_branch()), Some(new_oid));
    assert_eq!(
        forge.file(&repo(), &main_branch(), "content/posts/.gitkeep"),
        Some(Vec::new())
    );

    match forge.operations().last() {
        Some(MockOperation::CreateCommit {
            expected, headline, ..
        }) => {
            assert_eq!(expected.as_str(), "abc123");
            assert_eq!(headline, "feat(content): create posts");
        }
        other => panic!("expected a commit, got {:?}", other),
    }
}

#[tokio::test]
async fn monorepo_paths_are_prefixed() {
    let forge = forge();
    let root = ContentRoot::new(Some("apps/web"), "content").unwrap();
    let mut builder = ChangeSetBuilder::new(root);
    let message = content::save_document(&mut builder, "posts", "hello", "# Hello").unwrap();
    assert_eq!(message, "feat(posts): hello");

    let result = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .run(builder.build(), &repo(), &main_branch(), &message)
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(
        forge.files(&repo(), &main_branch()),
        vec!["apps/web/content/posts/hello.md".to_string()]
    );
}

#[tokio::test]
async fn add_and_delete_land_in_one_commit() {
    let forge = forge().with_file(&repo(), &main_branch(), "content/posts/old.md", "old");
    let mut builder = ChangeSetBuilder::new(ContentRoot::new(None, "content").unwrap());
    builder.add_or_replace("posts/new.md", "new").unwrap();
    builder.delete("posts/old.md").unwrap();

    let result = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .run(builder.build(), &repo(), &main_branch(), "chore: swap posts")
        .await
        .unwrap();

    assert!(result.is_success());
    assert_eq!(forge.commit_requests(), 1);
    assert_eq!(
        forge.files(&repo(), &main_branch()),
        vec!["content/posts/new.md".to_string()]
    );
}

#[tokio::test]
async fn moved_branch_is_conflict_and_nothing_lands() {
    let forge = forge();
    let head = HeadResolver::new(Arc::new(forge.clone()), TIMEOUT)
        .fetch(&repo(), &main_branch())
        .await
        .unwrap();

    // Someone else commits in between.
    let moved = forge.advance_branch(&repo(), &main_branch()).unwrap();

    let mut builder = ChangeSetBuilder::new(ContentRoot::repository());
    builder.add_or_replace("content/a.md", "a").unwrap();
    let result = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .run_at(builder.build(), head, "feat: a")
        .await
        .unwrap();

    assert_eq!(
        result,
        CommitResult::Conflict {
            stale_oid: Oid::new("abc123").unwrap()
        }
    );
    assert!(result.is_retryable());
    assert_eq!(forge.head(&repo(), &main_branch()), Some(moved));
    assert!(forge.files(&repo(), &main_branch()).is_empty());
}

#[tokio::test]
async fn retry_after_conflict_succeeds_against_fresh_head() {
    let forge = forge();
    let stale = HeadRef::new(repo(), main_branch(), Oid::new("abc123").unwrap());
    forge.advance_branch(&repo(), &main_branch()).unwrap();

    let change_set = || {
        let mut builder = ChangeSetBuilder::new(ContentRoot::repository());
        builder.add_or_replace("content/a.md", "a").unwrap();
        builder.build()
    };

    let first = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .run_at(change_set(), stale, "feat: a")
        .await
        .unwrap();
    assert!(first.is_conflict());

    let second = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .run(change_set(), &repo(), &main_branch(), "feat: a")
        .await
        .unwrap();
    assert!(second.is_success());
}

#[tokio::test]
async fn sequential_commits_chain_on_returned_oid() {
    let forge = forge();
    let mut head = HeadRef::new(repo(), main_branch(), Oid::new("abc123").unwrap());

    for slug in ["one", "two", "three"] {
        let mut builder = ChangeSetBuilder::new(ContentRoot::new(None, "content").unwrap());
        let message = content::save_document(&mut builder, "posts", slug, slug).unwrap();
        let result = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
            .run_at(builder.build(), head.clone(), &message)
            .await
            .unwrap();
        head.oid = result.into_result().unwrap();
    }

    assert_eq!(forge.head(&repo(), &main_branch()), Some(head.oid));
    assert_eq!(forge.files(&repo(), &main_branch()).len(), 3);
    assert_eq!(forge.commit_requests(), 3);
}

#[tokio::test]
async fn timeout_is_failure_and_not_retried() {
    let forge = forge().with_latency(Duration::from_millis(500));
    let mut builder = ChangeSetBuilder::new(ContentRoot::repository());
    builder.add_or_replace("content/a.md", "a").unwrap();
    let head = HeadRef::new(repo(), main_branch(), Oid::new("abc123").unwrap());

    let result = CommitAttempt::new(Arc::new(forge.clone()), Duration::from_millis(50))
        .run_at(builder.build(), head, "feat: a")
        .await
        .unwrap();

    match result {
        CommitResult::Failure(err) => assert_eq!(err.kind(), ErrorKind::Timeout),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(forge.commit_requests(), 1);
}

#[tokio::test]
async fn oversized_file_is_refused_before_any_request() {
    let forge = forge();
    let mut builder = ChangeSetBuilder::new(ContentRoot::repository());
    builder.add_or_replace_bytes("content/big.bin", &[0u8; 64]).unwrap();

    let result = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .with_compiler(Compiler::new(32))
        .run(builder.build(), &repo(), &main_branch(), "feat: big")
        .await
        .unwrap();

    match result {
        CommitResult::Failure(err) => assert_eq!(err.kind(), ErrorKind::Validation),
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(forge.operations().is_empty());
}

#[tokio::test]
async fn empty_change_set_is_refused_before_any_request() {
    let forge = forge();
    let builder = ChangeSetBuilder::new(ContentRoot::new(None, "content").unwrap());

    let result = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .run(builder.build(), &repo(), &main_branch(), "feat: nothing")
        .await
        .unwrap();

    match result {
        CommitResult::Failure(err) => assert_eq!(err.kind(), ErrorKind::Validation),
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert!(forge.operations().is_empty());
    assert_eq!(forge.head(&repo(), &main_branch()), Some(Oid::new("abc123").unwrap()));
}

#[tokio::test]
async fn unresolvable_head_fails_without_commit() {
    let forge = forge().fail_on(FailOn::FetchHead(ForgeError::AuthRequired));
    let mut builder = ChangeSetBuilder::new(ContentRoot::repository());
    builder.add_or_replace("content/a.md", "a").unwrap();

    let result = CommitAttempt::new(Arc::new(forge.clone()), TIMEOUT)
        .run(builder.build(), &repo(), &main_branch(), "feat: a")
        .await
        .unwrap();

    match result {
        CommitResult::Failure(err) => assert_eq!(err.kind(), ErrorKind::Auth),
        other => panic!("expected auth failure, got {:?}", other),
    }
    assert_eq!(forge.commit_requests(), 0);
}

#[tokio::test]
async fn observers_see_each_state_and_unsaved_flag_clears() {
    let forge = forge();
    let recorder = Arc::new(Recorder::default());
    let unsaved = UnsavedChanges::new();
    unsaved.mark_dirty();

    let mut builder = ChangeSetBuilder::new(ContentRoot::new(None, "content").unwrap());
    let message = content::delete_document(&mut builder, "posts", "hello").unwrap();
    let forge = forge.with_file(&repo(), &main_branch(), "content/posts/hello.md", "hi");

    let result = CommitAttempt::new(Arc::new(forge), TIMEOUT)
        .observe(recorder.clone())
        .observe(Arc::new(unsaved.clone()))
        .run(builder.build(), &repo(), &main_branch(), &message)
        .await
        .unwrap();

    assert!(result.is_success());
    assert!(!unsaved.is_dirty());
    assert_eq!(
        *recorder.0.lock().unwrap(),
        ["resolving", "compiling", "submitting", "succeeded"]
    );
}

#[tokio::test]
async fn unsaved_flag_survives_conflict() {
    let forge = forge();
    forge.advance_branch(&repo(), &main_branch()).unwrap();
    let unsaved = UnsavedChanges::new();
    unsaved.mark_dirty();

    let mut builder = ChangeSetBuilder::new(ContentRoot::repository());
    builder.add_or_replace("content/a.md", "a").unwrap();
    let head = HeadRef::new(repo(), main_branch(), Oid::new("abc123").unwrap());

    let result = CommitAttempt::new(Arc::new(forge), TIMEOUT)
        .observe(Arc::new(unsaved.clone()))
        .run_at(builder.build(), head, "feat: a")
        .await
        .unwrap();

    assert!(result.is_conflict());
    assert!(unsaved.is_dirty());
}
