//! rm command - Delete files under the content root

use anyhow::Result;

use super::{commit, load_config};
use crate::cli::Context;
use crate::commit::ChangeSetBuilder;

/// Delete `paths` in a single commit.
pub fn rm(
    ctx: &Context,
    paths: &[String],
    message: Option<&str>,
    expected_head: Option<&str>,
) -> Result<()> {
    let config = load_config(ctx)?;
    let mut builder = ChangeSetBuilder::new(config.content_root()?);
    for path in paths {
        builder.delete(path)?;
    }

    let message = match message {
        Some(m) => m.to_string(),
        None => default_message(paths),
    };
    commit(ctx, &config, builder.build(), &message, expected_head)?;
    Ok(())
}

fn default_message(paths: &[String]) -> String {
    match paths {
        [one] => format!("feat(content): remove {}", one.trim_matches('/')),
        many => format!("feat(content): remove {} files", many.len()),
    }
}
