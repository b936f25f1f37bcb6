//! collection command - Create an empty collection

use anyhow::Result;

use super::{commit, load_config};
use crate::cli::Context;
use crate::commit::ChangeSetBuilder;
use crate::content;

/// Commit a keep file for a new collection.
pub fn create_collection(
    ctx: &Context,
    name: &str,
    existing: &[String],
    expected_head: Option<&str>,
) -> Result<()> {
    let config = load_config(ctx)?;
    let mut builder = ChangeSetBuilder::new(config.content_root()?);
    let message = content::create_collection(&mut builder, name, existing)?;
    commit(ctx, &config, builder.build(), &message, expected_head)?;
    Ok(())
}
