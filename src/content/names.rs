//! content::names
//!
//! Validated collection names and document slugs.
//!
//! Names are checked, never rewritten: turning free-form titles into slugs
//! is the caller's job.

use thiserror::Error;

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 200;

/// Slugs that would shadow admin routes.
const RESERVED_SLUGS: [&str; 1] = ["new"];

/// Errors from name validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NameError {
    /// Empty collection name.
    #[error("collection name is required")]
    EmptyCollection,

    /// Collection name with characters outside `[A-Za-z0-9]`.
    #[error("invalid collection name '{0}': only letters and digits are allowed")]
    InvalidCollection(String),

    /// Collection name already used, compared case-insensitively.
    #[error("'{0}' is already taken")]
    CollectionTaken(String),

    /// Slug not made of lowercase words joined by single hyphens.
    #[error(
        "invalid slug '{0}': use lowercase letters, digits and single hyphens, not at either end"
    )]
    InvalidSlug(String),

    /// Slug that shadows a route.
    #[error("'{0}' is not a valid slug")]
    ReservedSlug(String),

    /// Slug over [`MAX_SLUG_LEN`].
    #[error("slugs can be at most {MAX_SLUG_LEN} characters, got {0}")]
    SlugTooLong(usize),
}

/// The name of a collection (a directory under the content root).
///
/// # Example
///
/// ```
/// use gitcms::content::CollectionName;
///
/// let name = CollectionName::new("Posts", &["docs"]).unwrap();
/// assert_eq!(name.as_str(), "Posts");
/// assert!(CollectionName::new("posts", &["Posts"]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionName(String);

impl CollectionName {
    /// Validate `name` against the format and the names already in use.
    pub fn new<S: AsRef<str>>(name: &str, existing: &[S]) -> Result<Self, NameError> {
        let name = Self::parse(name)?;
        if existing
            .iter()
            .any(|e| e.as_ref().eq_ignore_ascii_case(&name.0))
        {
            return Err(NameError::CollectionTaken(name.0));
        }
        Ok(name)
    }

    /// Validate the format only; for collections that already exist.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::EmptyCollection);
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(NameError::InvalidCollection(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The slug of a document, its file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentSlug(String);

impl DocumentSlug {
    pub fn new(slug: &str) -> Result<Self, NameError> {
        let len = slug.chars().count();
        if len > MAX_SLUG_LEN {
            return Err(NameError::SlugTooLong(len));
        }
        if RESERVED_SLUGS.contains(&slug) {
            return Err(NameError::ReservedSlug(slug.to_string()));
        }
        let well_formed = !slug.is_empty()
            && slug.split('-').all(|word| {
                !word.is_empty()
                    && word
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            });
        if !well_formed {
            return Err(NameError::InvalidSlug(slug.to_string()));
        }
        Ok(Self(slug.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
