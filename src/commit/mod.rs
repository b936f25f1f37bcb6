//! commit
//!
//! Commit construction with optimistic concurrency.
//!
//! # Architecture
//!
//! A logical action becomes exactly one atomic commit on a remote branch:
//!
//! 1. [`HeadResolver`] reads the branch tip, the concurrency token
//! 2. [`ChangeSetBuilder`] records the file operations
//! 3. [`Compiler`] turns them into a [`CommitInput`] bound to that tip
//! 4. [`CommitExecutor`] submits it and reports a [`CommitResult`]
//!
//! If the branch moved in between, the remote refuses the commit and the
//! result is [`CommitResult::Conflict`]. Nothing retries automatically.
//! [`CommitAttempt`] runs the chain as one observable unit.
//!
//! # Modules
//!
//! - `head`: branch tip resolution
//! - `change_set`: file operations and deduplication
//! - `compile`: payload construction
//! - `executor`: submission and outcome
//! - `attempt`: lifecycle state machine
//! - `observer`: transition observers
//! - `error`: error taxonomy

mod attempt;
mod change_set;
mod compile;
mod error;
mod executor;
mod head;
mod observer;

pub use attempt::{AttemptId, AttemptState, CommitAttempt, TransitionError};
pub use change_set::{ChangeSet, ChangeSetBuilder, Encoding, FileContent, FileOperation};
pub use compile::{
    compile, CommitInput, CommitMessage, CommittableBranch, Compiler, FileAddition, FileChanges,
    FileDeletion,
};
pub use error::{CommitError, ErrorKind, ValidationError};
pub use executor::{CommitExecutor, CommitResult};
pub use head::{HeadRef, HeadResolver};
pub use observer::{AttemptObserver, UnsavedChanges};
