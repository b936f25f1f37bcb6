//! commit::observer
//!
//! Observers of attempt state transitions.
//!
//! The core keeps no UI state of its own. Anything that reacts to commits,
//! such as an editor's "unsaved changes" indicator, registers an
//! [`AttemptObserver`] on the attempt instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::attempt::{AttemptId, AttemptState};

/// Receives every state an attempt enters.
///
/// Called synchronously from the attempt; implementations must not block.
pub trait AttemptObserver: Send + Sync {
    fn on_transition(&self, attempt: &AttemptId, state: &AttemptState);
}

/// Tracks whether local edits are not yet committed.
///
/// A successful commit clears the flag. A conflict or failure leaves it
/// set: the edits are still only local. Clones share the flag.
///
/// # Example
///
/// ```
/// use gitcms::commit::UnsavedChanges;
///
/// let unsaved = UnsavedChanges::new();
/// assert!(!unsaved.is_dirty());
/// unsaved.mark_dirty();
/// assert!(unsaved.is_dirty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct UnsavedChanges {
    dirty: Arc<AtomicBool>,
}

impl UnsavedChanges {
    /// A clean flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local edit.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }
}

impl AttemptObserver for UnsavedChanges {
    fn on_transition(&self, attempt: &AttemptId, state: &AttemptState) {
        if let AttemptState::Succeeded { .. } = state {
            tracing::debug!(attempt_id = %attempt, "changes committed, clearing unsaved flag");
            self.dirty.store(false, Ordering::SeqCst);
        }
    }
}
