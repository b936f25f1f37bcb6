//! core::paths
//!
//! Path routing from logical content paths to repository paths.
//!
//! # Layout
//!
//! Every file the tool writes lives under a content root inside the
//! repository, optionally below a monorepo subdirectory:
//!
//! ```text
//! <monorepo_path>/<content_path>/<logical path>
//! apps/web       /content       /posts/hello.md
//! ```
//!
//! # Invariants
//!
//! - A [`RepoPath`] is repository-relative, `/`-separated, with no empty,
//!   `.` or `..` segments.
//! - A path resolved through a [`ContentRoot`] never escapes that root.
//!
//! # Example
//!
//! ```
//! use gitcms::core::paths::ContentRoot;
//!
//! let root = ContentRoot::new(Some("apps/web"), "content").unwrap();
//! let path = root.resolve("posts/hello.md").unwrap();
//! assert_eq!(path.as_str(), "apps/web/content/posts/hello.md");
//!
//! assert!(root.resolve("../secrets.env").is_err());
//! ```

use serde::Serialize;
use thiserror::Error;

/// Why a path was refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid path '{path}': {reason}")]
pub struct PathError {
    /// The path as supplied.
    pub path: String,
    /// What is wrong with it.
    pub reason: String,
}

impl PathError {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// A normalized, repository-relative file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct RepoPath(String);

impl RepoPath {
    /// Normalize a repository-relative path.
    ///
    /// Empty and `.` segments are dropped. A leading `/`, a `..` segment,
    /// backslashes and control characters are rejected, as is a path that
    /// normalizes to nothing.
    pub fn new(path: &str) -> Result<Self, PathError> {
        let segments = normalize_segments(path)?;
        if segments.is_empty() {
            return Err(PathError::new(path, "path is empty"));
        }
        Ok(Self(segments.join("/")))
    }

    /// Get the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RepoPath> for String {
    fn from(path: RepoPath) -> Self {
        path.0
    }
}

impl AsRef<str> for RepoPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepoPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The directory all content paths are resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentRoot {
    /// Normalized prefix segments (monorepo path followed by content path).
    prefix: Vec<String>,
}

impl ContentRoot {
    /// Build a content root from an optional monorepo subdirectory and the
    /// content path within it.
    ///
    /// Either part may be empty. Both are subject to the same rules as
    /// [`RepoPath`].
    pub fn new(monorepo_path: Option<&str>, content_path: &str) -> Result<Self, PathError> {
        let mut prefix = match monorepo_path {
            Some(mono) => normalize_segments(mono)?,
            None => Vec::new(),
        };
        prefix.extend(normalize_segments(content_path)?);
        Ok(Self { prefix })
    }

    /// A root at the repository top level: logical paths are repository paths.
    pub fn repository() -> Self {
        Self::default()
    }

    /// Resolve a logical path below this root.
    pub fn resolve(&self, logical: &str) -> Result<RepoPath, PathError> {
        let segments = normalize_segments(logical)?;
        if segments.is_empty() {
            return Err(PathError::new(logical, "path is empty"));
        }
        let mut all = self.prefix.clone();
        all.extend(segments);
        Ok(RepoPath(all.join("/")))
    }
}

fn normalize_segments(path: &str) -> Result<Vec<String>, PathError> {
    if path.starts_with('/') {
        return Err(PathError::new(path, "absolute paths are not allowed"));
    }
    if path.contains('\\') {
        return Err(PathError::new(path, "backslashes are not allowed"));
    }
    if path.chars().any(|c| c.is_control()) {
        return Err(PathError::new(path, "control characters are not allowed"));
    }

    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(PathError::new(path, "'..' segments are not allowed")),
            s => segments.push(s.to_string()),
        }
    }
    Ok(segments)
}
