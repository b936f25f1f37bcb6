//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--owner`, `--repo`, `--branch`: Override the configured target

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gitcms - Commit content to a GitHub branch, atomically and conflict-aware
#[derive(Parser, Debug)]
#[command(name = "gitcms")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gitcms was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Repository owner (user or organization)
    #[arg(long, global = true, value_name = "OWNER")]
    pub owner: Option<String>,

    /// Repository name, `owner/name`, or a GitHub URL
    #[arg(long, global = true, value_name = "NAME")]
    pub repo: Option<String>,

    /// Branch to commit to
    #[arg(long, global = true, value_name = "BRANCH")]
    pub branch: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the current head commit of the branch
    #[command(
        name = "head",
        long_about = "Print the current head commit id of the configured branch.\n\n\
            The id is read fresh from GitHub on every call. Pass it to \
            --expected-head to pin a later commit to this exact state."
    )]
    Head,

    /// Manage collections
    #[command(subcommand)]
    Collection(CollectionAction),

    /// Add or replace a file under the content root
    #[command(
        name = "put",
        long_about = "Add or replace one file under the content root in a single commit.\n\n\
            Text files are sent as-is, anything else is sent base64-encoded. The \
            commit is refused if the branch moved since its head was read.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Publish a post
    gitcms put posts/hello-world.md --file ./hello-world.md

    # Only commit if nobody else committed since `gitcms head` printed abc123
    gitcms put posts/hello-world.md --file ./hello-world.md --expected-head abc123"
    )]
    Put {
        /// Destination path, relative to the content root
        path: String,

        /// Local file to upload
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Commit only if the branch is still at this commit
        #[arg(long, value_name = "OID")]
        expected_head: Option<String>,
    },

    /// Delete files under the content root
    #[command(name = "rm")]
    Rm {
        /// Paths to delete, relative to the content root
        #[arg(required = true)]
        paths: Vec<String>,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Commit only if the branch is still at this commit
        #[arg(long, value_name = "OID")]
        expected_head: Option<String>,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigAction),

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    gitcms completion bash >> ~/.bashrc

    # Zsh
    gitcms completion zsh > ~/.zfunc/_gitcms"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Collection subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CollectionAction {
    /// Create an empty collection
    Create {
        /// Collection name (letters and digits)
        name: String,

        /// Names already in use; a case-insensitive match is refused
        #[arg(long, value_delimiter = ',', value_name = "NAMES")]
        existing: Vec<String>,

        /// Commit only if the branch is still at this commit
        #[arg(long, value_name = "OID")]
        expected_head: Option<String>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
