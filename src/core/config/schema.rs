//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! [repository]
//! owner = "acme"
//! name = "site"
//! branch = "main"
//!
//! [content]
//! path = "outstatic/content"
//! monorepo_path = "apps/web"
//!
//! [api]
//! graphql_url = "https://api.github.com/graphql"
//! timeout_secs = 30
//! max_file_bytes = 104857600
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing so that a bad branch name or a content
//! path that escapes the repository is reported at load time rather than on
//! the first commit.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::paths::ContentRoot;
use crate::core::types::{BranchName, RepoId};

/// One configuration file.
///
/// Every field is optional so that files can be layered; [`super::Config`]
/// applies defaults and precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Target repository and branch.
    pub repository: Option<RepositoryConfig>,

    /// Where content lives inside the repository.
    pub content: Option<ContentConfig>,

    /// Remote API settings.
    pub api: Option<ApiConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(repository) = &self.repository {
            repository.validate()?;
        }
        if let Some(content) = &self.content {
            content.validate()?;
        }
        if let Some(api) = &self.api {
            api.validate()?;
        }
        Ok(())
    }

    /// Overlay `other` on top of `self`, field by field.
    pub fn merge(self, other: FileConfig) -> FileConfig {
        FileConfig {
            repository: merge_section(self.repository, other.repository, |a, b| {
                RepositoryConfig {
                    owner: b.owner.or(a.owner),
                    name: b.name.or(a.name),
                    branch: b.branch.or(a.branch),
                }
            }),
            content: merge_section(self.content, other.content, |a, b| ContentConfig {
                path: b.path.or(a.path),
                monorepo_path: b.monorepo_path.or(a.monorepo_path),
            }),
            api: merge_section(self.api, other.api, |a, b| ApiConfig {
                graphql_url: b.graphql_url.or(a.graphql_url),
                timeout_secs: b.timeout_secs.or(a.timeout_secs),
                max_file_bytes: b.max_file_bytes.or(a.max_file_bytes),
            }),
        }
    }
}

fn merge_section<T>(base: Option<T>, over: Option<T>, f: impl FnOnce(T, T) -> T) -> Option<T> {
    match (base, over) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (a, b) => b.or(a),
    }
}

/// Repository identification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Owner (user or organization)
    pub owner: Option<String>,

    /// Repository name
    pub name: Option<String>,

    /// Branch commits are written to
    pub branch: Option<String>,
}

impl RepositoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let (Some(owner), Some(name)) = (&self.owner, &self.name) {
            RepoId::new(owner, name)
                .map_err(|e| ConfigError::InvalidValue(format!("repository: {}", e)))?;
        } else {
            for (label, value) in [("owner", &self.owner), ("name", &self.name)] {
                if value.as_deref() == Some("") {
                    return Err(ConfigError::InvalidValue(format!(
                        "repository {} cannot be empty",
                        label
                    )));
                }
            }
        }

        if let Some(branch) = &self.branch {
            BranchName::new(branch)
                .map_err(|e| ConfigError::InvalidValue(format!("invalid branch: {}", e)))?;
        }

        Ok(())
    }
}

/// Content location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Content root, relative to the monorepo path
    pub path: Option<String>,

    /// Subdirectory of a monorepo the site lives in
    pub monorepo_path: Option<String>,
}

impl ContentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ContentRoot::new(
            self.monorepo_path.as_deref(),
            self.path.as_deref().unwrap_or_default(),
        )
        .map_err(|e| ConfigError::InvalidValue(format!("content: {}", e)))?;
        Ok(())
    }
}

/// Remote API settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    /// GraphQL endpoint (GitHub Enterprise installs use their own)
    pub graphql_url: Option<String>,

    /// Bound on each network call
    pub timeout_secs: Option<u64>,

    /// Largest decoded file accepted into a commit
    pub max_file_bytes: Option<u64>,
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.graphql_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "graphql_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_file_bytes == Some(0) {
            return Err(ConfigError::InvalidValue(
                "max_file_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
