//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Results go to stdout, diagnostics to stderr. Everything except errors
//! respects the quiet flag. Structured diagnostics for `--debug` go through
//! `tracing`, not through this module.

use std::fmt::Display;

use crate::commit::HeadRef;
use crate::core::types::Oid;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. Quiet wins over debug.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a follow-up suggestion (respects quiet mode).
pub fn hint(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("hint: {}", message);
    }
}

/// Describe a landed commit.
pub fn format_commit(head: &HeadRef, new_oid: &Oid) -> String {
    format!(
        "{}/{}: {} -> {}",
        head.repo,
        head.branch,
        head.oid.short(7),
        new_oid.short(7)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BranchName, RepoId};

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
    }

    #[test]
    fn commit_summary() {
        let head = HeadRef::new(
            RepoId::new("acme", "site").unwrap(),
            BranchName::new("main").unwrap(),
            Oid::new("abc123def456").unwrap(),
        );
        let new_oid = Oid::new("0123456789abcdef").unwrap();
        assert_eq!(
            format_commit(&head, &new_oid),
            "acme/site/main: abc123d -> 0123456"
        );
    }
}
