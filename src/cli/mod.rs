//! cli
//!
//! Command-line interface layer for gitcms.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the log subscriber
//! - Delegate to command handlers
//! - Map outcomes to exit codes
//!
//! # Architecture
//!
//! The CLI layer is thin. It loads configuration, builds the GitHub forge
//! and hands change sets to [`crate::commit::CommitAttempt`]. All
//! commit semantics live in the library.
//!
//! # Exit Codes
//!
//! - `0`: success
//! - `1`: any failure
//! - `2`: the branch moved since its head was read (refresh and retry)

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::commit::CommitError;
use crate::forge::ForgeError;
use crate::ui::output::Verbosity;

/// Exit code for a stale expected head.
pub const EXIT_CONFLICT: u8 = 2;

/// Exit code for every other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Per-invocation settings shared by all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    pub verbosity: Verbosity,
    /// `--owner` override.
    pub owner: Option<String>,
    /// `--repo` override.
    pub repo: Option<String>,
    /// `--branch` override.
    pub branch: Option<String>,
}

impl Context {
    /// The directory project configuration is read from.
    pub fn work_dir(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug, cli.quiet);

    let ctx = Context {
        cwd: cli.cwd.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        owner: cli.owner.clone(),
        repo: cli.repo.clone(),
        branch: cli.branch.clone(),
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the stderr log subscriber.
///
/// `--debug` enables debug output for this crate. Otherwise `RUST_LOG` is
/// honored, falling back to warnings only (errors only with `--quiet`).
fn init_tracing(debug: bool, quiet: bool) {
    let filter = if debug {
        EnvFilter::new("gitcms=debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(if quiet { "error" } else { "warn" }))
    };

    // A subscriber may already be set when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let conflict = err.chain().any(|cause| {
        cause
            .downcast_ref::<CommitError>()
            .map(CommitError::is_conflict)
            .or_else(|| cause.downcast_ref::<ForgeError>().map(ForgeError::is_conflict))
            .unwrap_or(false)
    });
    if conflict {
        EXIT_CONFLICT
    } else {
        EXIT_FAILURE
    }
}
