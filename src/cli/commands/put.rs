//! put command - Add or replace one file under the content root

use std::path::Path;

use anyhow::{Context as _, Result};

use super::{commit, load_config};
use crate::cli::Context;
use crate::commit::ChangeSetBuilder;

/// Upload a local file to `path`.
pub fn put(
    ctx: &Context,
    path: &str,
    file: &Path,
    message: Option<&str>,
    expected_head: Option<&str>,
) -> Result<()> {
    let config = load_config(ctx)?;
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

    let mut builder = ChangeSetBuilder::new(config.content_root()?);
    builder.add_or_replace_bytes(path, &bytes)?;

    let message = match message {
        Some(m) => m.to_string(),
        None => format!("feat(content): update {}", path.trim_matches('/')),
    };
    commit(ctx, &config, builder.build(), &message, expected_head)?;
    Ok(())
}
