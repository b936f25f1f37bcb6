//! commit::compile
//!
//! Compiles a change set, a resolved head and a message into the wire
//! payload of one commit.
//!
//! # Design
//!
//! Compilation is pure and synchronous. It fails fast on anything the remote
//! would refuse anyway (no changes, oversized files, undecodable content) so
//! that no round trip is wasted. The resulting [`CommitInput`] serializes to
//! exactly the `CreateCommitOnBranchInput` shape of the GitHub GraphQL API:
//!
//! ```json
//! {
//!   "branch": { "repositoryNameWithOwner": "acme/site", "branchName": "main" },
//!   "message": { "headline": "feat(content): create posts" },
//!   "fileChanges": {
//!     "additions": [{ "path": "content/posts/.gitkeep", "contents": "" }],
//!     "deletions": []
//!   },
//!   "expectedHeadOid": "abc123"
//! }
//! ```
//!
//! Addition contents are always base64 on the wire.

use serde::{Serialize, Serializer};

use super::change_set::{ChangeSet, FileContent, FileOperation};
use super::error::ValidationError;
use super::head::HeadRef;
use crate::core::config::DEFAULT_MAX_FILE_BYTES;
use crate::core::paths::RepoPath;
use crate::core::types::{BranchName, Oid, RepoId};

/// Target branch of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittableBranch {
    #[serde(rename = "repositoryNameWithOwner", serialize_with = "name_with_owner")]
    repo: RepoId,
    branch_name: BranchName,
}

fn name_with_owner<S: Serializer>(repo: &RepoId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&repo.name_with_owner())
}

impl CommittableBranch {
    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn branch_name(&self) -> &BranchName {
        &self.branch_name
    }
}

/// Commit message split into headline and optional body.
///
/// # Example
///
/// ```
/// use gitcms::commit::CommitMessage;
///
/// let msg = CommitMessage::parse("feat(posts): hello\n\nFirst post.\n");
/// assert_eq!(msg.headline(), "feat(posts): hello");
/// assert_eq!(msg.body(), Some("First post."));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitMessage {
    headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<String>,
}

impl CommitMessage {
    /// Split a free-form message: the first line is the headline, the
    /// remaining text (trimmed) is the body. The format is not checked.
    pub fn parse(message: &str) -> Self {
        let (headline, rest) = message.split_once('\n').unwrap_or((message, ""));
        let body = rest.trim();
        Self {
            headline: headline.trim_end().to_string(),
            body: (!body.is_empty()).then(|| body.to_string()),
        }
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

impl std::fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.body {
            Some(body) => write!(f, "{}\n\n{}", self.headline, body),
            None => write!(f, "{}", self.headline),
        }
    }
}

/// A file to create or replace; `contents` is base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAddition {
    pub path: RepoPath,
    pub contents: String,
}

/// A file to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDeletion {
    pub path: RepoPath,
}

/// Additions and deletions of one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileChanges {
    pub additions: Vec<FileAddition>,
    pub deletions: Vec<FileDeletion>,
}

impl FileChanges {
    /// Total number of paths touched.
    pub fn len(&self) -> usize {
        self.additions.len() + self.deletions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

/// The compiled, immutable payload of one commit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitInput {
    branch: CommittableBranch,
    message: CommitMessage,
    file_changes: FileChanges,
    expected_head_oid: Oid,
}

impl CommitInput {
    pub fn branch(&self) -> &CommittableBranch {
        &self.branch
    }

    pub fn message(&self) -> &CommitMessage {
        &self.message
    }

    pub fn file_changes(&self) -> &FileChanges {
        &self.file_changes
    }

    /// The branch tip this commit was built against.
    pub fn expected_head_oid(&self) -> &Oid {
        &self.expected_head_oid
    }
}

/// Turns change sets into commit payloads.
#[derive(Debug, Clone, Copy)]
pub struct Compiler {
    max_file_bytes: u64,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl Compiler {
    /// A compiler refusing files larger than `max_file_bytes` once decoded.
    pub fn new(max_file_bytes: u64) -> Self {
        Self { max_file_bytes }
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    /// Check a change set without a head.
    ///
    /// Runs every check [`Compiler::compile`] makes, so an attempt can refuse
    /// a bad change set before it talks to the remote at all.
    ///
    /// # Errors
    ///
    /// Same as [`Compiler::compile`].
    pub fn preflight(&self, change_set: &ChangeSet) -> Result<(), ValidationError> {
        if change_set.is_empty() {
            return Err(ValidationError::EmptyChangeSet);
        }
        for operation in change_set.operations() {
            if let FileOperation::Upsert { path, content } = operation {
                self.check(path, content)?;
            }
        }
        Ok(())
    }

    /// Compile one commit.
    ///
    /// Both the change set and the head are consumed: a change set is
    /// compiled once, and a head snapshot is good for one attempt only.
    ///
    /// # Errors
    ///
    /// - `EmptyChangeSet` if there is nothing to commit
    /// - `ContentTooLarge` if a file exceeds the limit
    /// - `InvalidEncoding` if base64 content does not decode
    pub fn compile(
        &self,
        change_set: ChangeSet,
        head: HeadRef,
        message: &str,
    ) -> Result<CommitInput, ValidationError> {
        if change_set.is_empty() {
            return Err(ValidationError::EmptyChangeSet);
        }

        let mut file_changes = FileChanges::default();
        for operation in change_set.into_operations() {
            match operation {
                FileOperation::Upsert { path, content } => {
                    let contents = self.encode(&path, &content)?;
                    file_changes.additions.push(FileAddition { path, contents });
                }
                FileOperation::Delete { path } => {
                    file_changes.deletions.push(FileDeletion { path });
                }
            }
        }

        let HeadRef { repo, branch, oid } = head;
        Ok(CommitInput {
            branch: CommittableBranch {
                repo,
                branch_name: branch,
            },
            message: CommitMessage::parse(message),
            file_changes,
            expected_head_oid: oid,
        })
    }

    fn encode(&self, path: &RepoPath, content: &FileContent) -> Result<String, ValidationError> {
        self.check(path, content)?;
        content
            .to_base64()
            .map_err(|e| ValidationError::InvalidEncoding {
                path: path.clone(),
                reason: e.to_string(),
            })
    }

    /// Decode `content` and hold it against the size limit.
    fn check(&self, path: &RepoPath, content: &FileContent) -> Result<(), ValidationError> {
        let bytes = content
            .to_bytes()
            .map_err(|e| ValidationError::InvalidEncoding {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        let size = bytes.len() as u64;
        if size > self.max_file_bytes {
            return Err(ValidationError::ContentTooLarge {
                path: path.clone(),
                size,
                limit: self.max_file_bytes,
            });
        }
        Ok(())
    }
}

/// Compile with the default limits.
pub fn compile(
    change_set: ChangeSet,
    head: HeadRef,
    message: &str,
) -> Result<CommitInput, ValidationError> {
    Compiler::default().compile(change_set, head, message)
}
