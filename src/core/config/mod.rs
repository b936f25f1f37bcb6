//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Two configuration scopes are layered:
//! - **Global**: User-level settings
//! - **Project**: `gitcms.toml` in the working directory
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Project config file
//! 4. CLI flags (applied with [`Config::with_overrides`])
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GITCMS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitcms/config.toml`
//! 3. `~/.gitcms/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use gitcms::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/site"))).unwrap();
//! println!("Branch: {}", config.branch().unwrap());
//! println!("Timeout: {:?}", config.timeout());
//! ```

pub mod schema;

pub use schema::{ApiConfig, ContentConfig, FileConfig, RepositoryConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::paths::ContentRoot;
use crate::core::types::{BranchName, RepoId};

/// Default GitHub GraphQL endpoint.
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Default branch commits are written to.
pub const DEFAULT_BRANCH: &str = "main";

/// Default content root.
pub const DEFAULT_CONTENT_PATH: &str = "outstatic/content";

/// Default bound on each network call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default per-file size limit (GitHub's hard limit for a single file).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// Project config file name, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "gitcms.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("missing config value: {0}")]
    Missing(&'static str),
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Effective settings after layering
    pub file: FileConfig,
    /// Files that contributed, lowest precedence first
    sources: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `cwd` is provided, a `gitcms.toml` there is layered over the
    /// global file.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(cwd: Option<&Path>) -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        let project = cwd.map(|dir| dir.join(PROJECT_CONFIG_FILE));
        Self::load_files(global.as_deref(), project.as_deref())
    }

    /// Load from explicit file locations. Paths that do not exist are skipped.
    pub fn load_files(global: Option<&Path>, project: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        for path in [global, project].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let layer = Self::read_file(path)?;
            layer.validate()?;
            config.file = config.file.merge(layer);
            config.sources.push(path.to_path_buf());
        }
        Ok(config)
    }

    /// Locate the global config file, if any exists.
    fn global_config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("GITCMS_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitcms/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".gitcms/config.toml"))
            .filter(|path| path.exists())
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply command-line overrides on top of the loaded files.
    pub fn with_overrides(
        mut self,
        owner: Option<String>,
        name: Option<String>,
        branch: Option<String>,
    ) -> Result<Self, ConfigError> {
        let overlay = FileConfig {
            repository: Some(RepositoryConfig {
                owner,
                name,
                branch,
            }),
            ..Default::default()
        };
        overlay.validate()?;
        self.file = self.file.merge(overlay);
        Ok(self)
    }

    /// Files that contributed to this configuration.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// The target repository.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if owner or name is not configured.
    pub fn repo(&self) -> Result<RepoId, ConfigError> {
        let repository = self.file.repository.as_ref();
        let owner = repository
            .and_then(|r| r.owner.clone())
            .ok_or(ConfigError::Missing("repository.owner"))?;
        let name = repository
            .and_then(|r| r.name.clone())
            .ok_or(ConfigError::Missing("repository.name"))?;
        RepoId::new(owner, name).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// The branch commits are written to. Defaults to `main`.
    pub fn branch(&self) -> Result<BranchName, ConfigError> {
        let branch = self
            .file
            .repository
            .as_ref()
            .and_then(|r| r.branch.as_deref())
            .unwrap_or(DEFAULT_BRANCH);
        BranchName::new(branch).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Content path. Defaults to `outstatic/content`.
    pub fn content_path(&self) -> &str {
        self.file
            .content
            .as_ref()
            .and_then(|c| c.path.as_deref())
            .unwrap_or(DEFAULT_CONTENT_PATH)
    }

    /// Monorepo subdirectory, if any.
    pub fn monorepo_path(&self) -> Option<&str> {
        self.file
            .content
            .as_ref()
            .and_then(|c| c.monorepo_path.as_deref())
            .filter(|p| !p.is_empty())
    }

    /// The content root logical paths are resolved against.
    pub fn content_root(&self) -> Result<ContentRoot, ConfigError> {
        ContentRoot::new(self.monorepo_path(), self.content_path())
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// GraphQL endpoint. Defaults to GitHub's public API.
    pub fn graphql_url(&self) -> &str {
        self.file
            .api
            .as_ref()
            .and_then(|a| a.graphql_url.as_deref())
            .unwrap_or(DEFAULT_GRAPHQL_URL)
    }

    /// Bound on each network call. Defaults to 30 seconds.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(
            self.file
                .api
                .as_ref()
                .and_then(|a| a.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Largest decoded file accepted into a commit. Defaults to 100 MiB.
    pub fn max_file_bytes(&self) -> u64 {
        self.file
            .api
            .as_ref()
            .and_then(|a| a.max_file_bytes)
            .unwrap_or(DEFAULT_MAX_FILE_BYTES)
    }
}
