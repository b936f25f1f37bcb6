//! content
//!
//! Content-level actions expressed as change sets.
//!
//! # Design
//!
//! Each intent validates its names, records its file operations on a
//! [`ChangeSetBuilder`] and returns the conventional commit message for the
//! action. The caller still owns the builder, so several intents can be
//! combined into one commit before it is compiled.
//!
//! Paths are relative to the builder's content root:
//!
//! | Intent | Operation | Message |
//! |---|---|---|
//! | [`create_collection`] | upsert `<name>/.gitkeep` (empty) | `feat(content): create <name>` |
//! | [`save_document`] | upsert `<collection>/<slug>.md` | `feat(<collection>): <slug>` |
//! | [`delete_document`] | delete `<collection>/<slug>.md` | `feat(<collection>): remove <slug>` |
//!
//! # Example
//!
//! ```
//! use gitcms::commit::ChangeSetBuilder;
//! use gitcms::content::create_collection;
//! use gitcms::core::paths::ContentRoot;
//!
//! let mut builder = ChangeSetBuilder::new(ContentRoot::new(None, "content").unwrap());
//! let message = create_collection(&mut builder, "posts", &["docs"]).unwrap();
//!
//! assert_eq!(message, "feat(content): create posts");
//! let change_set = builder.build();
//! assert_eq!(change_set.operations()[0].path().as_str(), "content/posts/.gitkeep");
//! ```

mod names;

pub use names::{CollectionName, DocumentSlug, NameError, MAX_SLUG_LEN};

use thiserror::Error;

use crate::commit::{ChangeSetBuilder, ValidationError};

/// Marker file that keeps an empty collection directory in git.
pub const KEEP_FILE: &str = ".gitkeep";

/// Extension of document files.
pub const DOCUMENT_EXTENSION: &str = "md";

/// Errors from content intents.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Record a new, empty collection.
///
/// `existing` lists the collection names already in use; a case-insensitive
/// match is refused.
pub fn create_collection<S: AsRef<str>>(
    builder: &mut ChangeSetBuilder,
    name: &str,
    existing: &[S],
) -> Result<String, ContentError> {
    let name = CollectionName::new(name, existing)?;
    builder.add_or_replace(&format!("{}/{}", name, KEEP_FILE), "")?;
    Ok(format!("feat(content): create {}", name))
}

/// Record a document write, creating or replacing it.
pub fn save_document(
    builder: &mut ChangeSetBuilder,
    collection: &str,
    slug: &str,
    body: impl Into<String>,
) -> Result<String, ContentError> {
    let (collection, slug) = document(collection, slug)?;
    builder.add_or_replace(&document_path(&collection, &slug), body)?;
    Ok(format!("feat({}): {}", collection, slug))
}

/// Record a document removal.
pub fn delete_document(
    builder: &mut ChangeSetBuilder,
    collection: &str,
    slug: &str,
) -> Result<String, ContentError> {
    let (collection, slug) = document(collection, slug)?;
    builder.delete(&document_path(&collection, &slug))?;
    Ok(format!("feat({}): remove {}", collection, slug))
}

fn document(collection: &str, slug: &str) -> Result<(CollectionName, DocumentSlug), NameError> {
    Ok((CollectionName::parse(collection)?, DocumentSlug::new(slug)?))
}

/// Path of a document relative to the content root.
pub fn document_path(collection: &CollectionName, slug: &DocumentSlug) -> String {
    format!("{}/{}.{}", collection, slug, DOCUMENT_EXTENSION)
}
