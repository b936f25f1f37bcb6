//! gitcms - Atomic, conflict-aware content commits to a GitHub branch
//!
//! gitcms turns content edits (create a collection, save or delete a
//! document, upload a file) into a single commit on a remote branch via
//! GitHub's GraphQL `createCommitOnBranch` mutation. No local checkout is
//! involved.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to commit)
//! - [`commit`] - Head resolution, change sets, payload compilation, submission
//! - [`content`] - Content intents expressed as change sets
//! - [`core`] - Domain types, path routing, configuration
//! - [`forge`] - Abstraction for remote forges (GitHub, in-memory mock)
//! - [`auth`] - Bearer token providers
//! - [`ui`] - Output utilities
//!
//! # Correctness Invariants
//!
//! 1. Every commit carries the head oid it was built against, and the remote
//!    refuses it if the branch has moved
//! 2. A commit is all-or-nothing; no partial file set is ever observable
//! 3. Invalid change sets are refused locally, before any network call
//! 4. A stale head is reported as a conflict, apart from every other failure

pub mod auth;
pub mod cli;
pub mod commit;
pub mod content;
pub mod core;
pub mod forge;
pub mod ui;
