//! forge
//!
//! Abstraction over the remote commit API.
//!
//! # Architecture
//!
//! The `Forge` trait defines the two remote operations the commit path
//! needs: reading a branch tip and atomically creating a commit guarded by
//! an expected head. Callers hold an `Arc<dyn Forge>` and never import a
//! concrete implementation.
//!
//! - Forge operations are invoked only after local validation passed
//! - A forge never retries a commit on its own
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and `ForgeError`
//! - [`github`]: GitHub implementation using the GraphQL API
//! - [`mock`]: In-memory implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
