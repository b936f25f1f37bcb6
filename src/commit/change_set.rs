//! commit::change_set
//!
//! Accumulates file operations for one logical action.
//!
//! # Design
//!
//! A logical action (create a collection, save a document and its index)
//! may touch several files. All of its operations are recorded here before
//! any network call, so the action becomes exactly one atomic commit and can
//! never be partially applied.
//!
//! # Invariants
//!
//! - Every path is resolved through the builder's [`ContentRoot`], so it is
//!   normalized and cannot escape the root.
//! - A path appears at most once. A later operation on the same path
//!   replaces the earlier one and takes the later position.
//!
//! # Example
//!
//! ```
//! use gitcms::commit::{ChangeSetBuilder, FileOperation};
//! use gitcms::core::paths::ContentRoot;
//!
//! let root = ContentRoot::new(None, "content").unwrap();
//! let mut builder = ChangeSetBuilder::new(root);
//! builder.add_or_replace("a/b.txt", "x").unwrap();
//! builder.delete("a/b.txt").unwrap();
//!
//! let change_set = builder.build();
//! assert_eq!(change_set.len(), 1);
//! assert!(matches!(change_set.operations()[0], FileOperation::Delete { .. }));
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::error::ValidationError;
use crate::core::paths::{ContentRoot, RepoPath};

/// How [`FileContent::data`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Plain UTF-8 text
    Utf8,
    /// Standard base64 (binary-safe)
    Base64,
}

/// The content of an added or replaced file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    data: String,
    encoding: Encoding,
}

impl FileContent {
    /// Text content.
    pub fn utf8(text: impl Into<String>) -> Self {
        Self {
            data: text.into(),
            encoding: Encoding::Utf8,
        }
    }

    /// Content that is already base64-encoded. Not checked here.
    pub fn base64(encoded: impl Into<String>) -> Self {
        Self {
            data: encoded.into(),
            encoding: Encoding::Base64,
        }
    }

    /// Raw bytes: kept as text when they are valid UTF-8, base64 otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::utf8(text),
            Err(_) => Self::base64(STANDARD.encode(bytes)),
        }
    }

    /// The content as stored.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The encoding of [`Self::data`].
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decode to raw bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.encoding {
            Encoding::Utf8 => Ok(self.data.as_bytes().to_vec()),
            Encoding::Base64 => STANDARD.decode(&self.data),
        }
    }

    /// Base64 form, as the commit API expects it.
    pub fn to_base64(&self) -> Result<String, base64::DecodeError> {
        match self.encoding {
            Encoding::Utf8 => Ok(STANDARD.encode(self.data.as_bytes())),
            Encoding::Base64 => {
                // Round-trip to reject garbage and normalize padding.
                let bytes = STANDARD.decode(&self.data)?;
                Ok(STANDARD.encode(bytes))
            }
        }
    }
}

/// One file-level change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOperation {
    /// Create the file or replace its content.
    Upsert { path: RepoPath, content: FileContent },
    /// Remove the file.
    Delete { path: RepoPath },
}

impl FileOperation {
    /// The repository path this operation targets.
    pub fn path(&self) -> &RepoPath {
        match self {
            FileOperation::Upsert { path, .. } | FileOperation::Delete { path } => path,
        }
    }

    /// Whether this operation removes a file.
    pub fn is_delete(&self) -> bool {
        matches!(self, FileOperation::Delete { .. })
    }
}

/// An ordered, deduplicated batch of operations for one commit.
///
/// Consumed by value when compiled, so a change set is used exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    operations: Vec<FileOperation>,
}

impl ChangeSet {
    /// Start a builder resolving paths against `root`.
    pub fn builder(root: ContentRoot) -> ChangeSetBuilder {
        ChangeSetBuilder::new(root)
    }

    /// Operations in emission order.
    pub fn operations(&self) -> &[FileOperation] {
        &self.operations
    }

    /// Number of distinct paths touched.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operation was recorded.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn into_operations(self) -> Vec<FileOperation> {
        self.operations
    }
}

/// Records operations for one logical action.
#[derive(Debug, Clone)]
pub struct ChangeSetBuilder {
    root: ContentRoot,
    operations: Vec<FileOperation>,
}

impl ChangeSetBuilder {
    /// Create a builder resolving logical paths against `root`.
    pub fn new(root: ContentRoot) -> Self {
        Self {
            root,
            operations: Vec::new(),
        }
    }

    /// The content root paths are resolved against.
    pub fn root(&self) -> &ContentRoot {
        &self.root
    }

    /// Create or replace a text file.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPath` if the path is malformed or
    /// escapes the content root.
    pub fn add_or_replace(
        &mut self,
        path: &str,
        content: impl Into<String>,
    ) -> Result<&mut Self, ValidationError> {
        self.upsert(path, FileContent::utf8(content))
    }

    /// Create or replace a file from base64 content.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPath` for a bad path and
    /// `ValidationError::InvalidEncoding` if the content does not decode.
    pub fn add_or_replace_base64(
        &mut self,
        path: &str,
        encoded: impl Into<String>,
    ) -> Result<&mut Self, ValidationError> {
        let resolved = self.root.resolve(path)?;
        let content = FileContent::base64(encoded);
        if let Err(e) = content.to_bytes() {
            return Err(ValidationError::InvalidEncoding {
                path: resolved,
                reason: e.to_string(),
            });
        }
        Ok(self.push(FileOperation::Upsert {
            path: resolved,
            content,
        }))
    }

    /// Create or replace a file from raw bytes.
    pub fn add_or_replace_bytes(
        &mut self,
        path: &str,
        bytes: &[u8],
    ) -> Result<&mut Self, ValidationError> {
        self.upsert(path, FileContent::from_bytes(bytes))
    }

    /// Remove a file.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPath` for a bad path.
    pub fn delete(&mut self, path: &str) -> Result<&mut Self, ValidationError> {
        let resolved = self.root.resolve(path)?;
        Ok(self.push(FileOperation::Delete { path: resolved }))
    }

    fn upsert(&mut self, path: &str, content: FileContent) -> Result<&mut Self, ValidationError> {
        let resolved = self.root.resolve(path)?;
        Ok(self.push(FileOperation::Upsert {
            path: resolved,
            content,
        }))
    }

    fn push(&mut self, operation: FileOperation) -> &mut Self {
        let before = self.operations.len();
        self.operations.retain(|op| op.path() != operation.path());
        if self.operations.len() != before {
            tracing::debug!(path = %operation.path(), "replacing earlier operation on path");
        }
        self.operations.push(operation);
        self
    }

    /// Number of distinct paths recorded so far.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Finish recording.
    pub fn build(self) -> ChangeSet {
        ChangeSet {
            operations: self.operations,
        }
    }
}
