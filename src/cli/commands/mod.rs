//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Records its intent in a change set
//! 3. Hands the change set to [`commit`], which drives one attempt
//!
//! Handlers do NOT call the forge's commit mutation directly.
//!
//! # Async Commands
//!
//! Network calls are async. Handlers build a tokio runtime with
//! [`block_on`] and wait for the attempt to finish.

mod collection;
mod completion;
mod config_cmd;
mod head;
mod put;
mod rm;

pub use collection::create_collection;
pub use completion::completion;
pub use config_cmd::show as config_show;
pub use head::head;
pub use put::put;
pub use rm::rm;

use std::sync::{Arc, Mutex};

use anyhow::{Context as _, Result};

use crate::auth::{AuthError, EnvTokenProvider, TOKEN_ENV_VARS};
use crate::cli::args::{CollectionAction, Command, ConfigAction};
use crate::cli::Context;
use crate::commit::{
    AttemptId, AttemptObserver, AttemptState, ChangeSet, CommitAttempt, CommitError,
    CommitResult, Compiler, HeadRef,
};
use crate::core::config::Config;
use crate::core::types::{Oid, RepoId};
use crate::forge::github::GitHubForge;
use crate::forge::{Forge, ForgeError};
use crate::ui::output;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Head => head::head(ctx),
        Command::Collection(CollectionAction::Create {
            name,
            existing,
            expected_head,
        }) => collection::create_collection(ctx, &name, &existing, expected_head.as_deref()),
        Command::Put {
            path,
            file,
            message,
            expected_head,
        } => put::put(ctx, &path, &file, message.as_deref(), expected_head.as_deref()),
        Command::Rm {
            paths,
            message,
            expected_head,
        } => rm::rm(ctx, &paths, message.as_deref(), expected_head.as_deref()),
        Command::Config(ConfigAction::Show) => config_cmd::show(ctx),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Load configuration for this invocation, command-line overrides applied.
pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    let cwd = ctx.work_dir()?;
    let (owner, name) = repo_override(ctx);
    let config = Config::load(Some(&cwd))
        .context("failed to load configuration")?
        .with_overrides(owner, name, ctx.branch.clone())?;
    Ok(config)
}

/// Split `--repo` given as `owner/name` or a GitHub URL; `--owner` wins.
fn repo_override(ctx: &Context) -> (Option<String>, Option<String>) {
    let parsed = ctx
        .repo
        .as_deref()
        .and_then(|r| RepoId::from_remote_url(r).or_else(|| r.parse::<RepoId>().ok()));
    match parsed {
        Some(id) => (
            ctx.owner.clone().or_else(|| Some(id.owner().to_string())),
            Some(id.name().to_string()),
        ),
        None => (ctx.owner.clone(), ctx.repo.clone()),
    }
}

/// The GitHub forge described by the configuration.
pub(crate) fn build_forge(config: &Config) -> Result<Arc<dyn Forge>> {
    let provider = EnvTokenProvider::from_env();
    match provider.source() {
        Some(var) => tracing::debug!(source = var, "using token from environment"),
        None => return Err(AuthError::NotAuthenticated(TOKEN_ENV_VARS.join(" or ")).into()),
    }
    let forge = GitHubForge::new(Arc::new(provider), config.timeout())?
        .with_graphql_url(config.graphql_url());
    Ok(Arc::new(forge))
}

/// Run a future on a fresh runtime.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    Ok(rt.block_on(future))
}

/// Remembers the head an attempt compiled against.
#[derive(Debug, Default)]
struct HeadCapture(Mutex<Option<HeadRef>>);

impl HeadCapture {
    fn take(&self) -> Option<HeadRef> {
        self.0.lock().ok().and_then(|mut head| head.take())
    }
}

impl AttemptObserver for HeadCapture {
    fn on_transition(&self, _attempt: &AttemptId, state: &AttemptState) {
        if let AttemptState::Compiling { head } = state {
            if let Ok(mut slot) = self.0.lock() {
                *slot = Some(head.clone());
            }
        }
    }
}

/// Commit a change set to the configured branch and report the outcome.
///
/// With `expected_head` the commit is built against that oid without
/// reading the branch first; otherwise the tip is resolved fresh.
pub(crate) fn commit(
    ctx: &Context,
    config: &Config,
    change_set: ChangeSet,
    message: &str,
    expected_head: Option<&str>,
) -> Result<Oid> {
    let repo = config.repo()?;
    let branch = config.branch()?;
    let expected_head = expected_head.map(Oid::new).transpose()?;
    let forge = build_forge(config)?;

    let capture = Arc::new(HeadCapture::default());
    let attempt = CommitAttempt::new(forge, config.timeout())
        .with_compiler(Compiler::new(config.max_file_bytes()))
        .observe(capture.clone());

    let result = block_on(async {
        match expected_head {
            Some(oid) => {
                let head = HeadRef::new(repo.clone(), branch.clone(), oid);
                attempt.run_at(change_set, head, message).await
            }
            None => attempt.run(change_set, &repo, &branch, message).await,
        }
    })??;

    match result {
        CommitResult::Success { new_oid } => {
            let line = match capture.take() {
                Some(head) => output::format_commit(&head, &new_oid),
                None => new_oid.to_string(),
            };
            output::print(line, ctx.verbosity);
            Ok(new_oid)
        }
        CommitResult::Conflict { stale_oid } => {
            output::hint(
                format!(
                    "{} moved since {}; run `gitcms head` and retry against the new head",
                    branch,
                    stale_oid.short(7)
                ),
                ctx.verbosity,
            );
            Err(CommitError::Forge(ForgeError::StaleHead {
                expected: stale_oid,
            }))
            .context("commit rejected")
        }
        CommitResult::Failure(error) => Err(error).context("commit failed"),
    }
}
