//! head command - Print the current tip of the configured branch

use anyhow::{Context as _, Result};

use super::{block_on, build_forge, load_config};
use crate::cli::Context;
use crate::commit::HeadResolver;
use crate::ui::output::{self, Verbosity};

/// Print the branch tip oid.
///
/// Quiet mode prints the bare oid so scripts can capture it.
pub fn head(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let repo = config.repo()?;
    let branch = config.branch()?;
    let resolver = HeadResolver::new(build_forge(&config)?, config.timeout());

    let head = block_on(resolver.fetch(&repo, &branch))?
        .with_context(|| format!("failed to read head of {}/{}", repo, branch))?;

    if ctx.verbosity == Verbosity::Quiet {
        println!("{}", head.oid);
    } else {
        output::print(format!("{}/{}: {}", head.repo, head.branch, head.oid), ctx.verbosity);
    }
    Ok(())
}
