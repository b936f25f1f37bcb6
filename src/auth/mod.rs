//! auth
//!
//! Bearer credentials for the forge adapters.
//!
//! # Design
//!
//! The access token is an opaque credential supplied from outside: an
//! environment variable, a session, a test fixture. Forge adapters ask a
//! [`TokenProvider`] for it on every request instead of holding a copy.
//!
//! # Security
//!
//! Tokens MUST never appear in:
//! - logs (including --debug)
//! - error messages
//! - debug output
//!
//! All types in this module implement custom Debug to redact token values.
//!
//! # Example
//!
//! ```
//! use gitcms::auth::{StaticTokenProvider, TokenProvider};
//!
//! # tokio_test::block_on(async {
//! let provider = StaticTokenProvider::new("ghp_example");
//! assert_eq!(provider.bearer_token().await.unwrap(), "ghp_example");
//! assert!(!format!("{:?}", provider).contains("ghp_example"));
//! # });
//! ```

mod errors;
mod provider;

pub use errors::AuthError;
pub use provider::{EnvTokenProvider, StaticTokenProvider, TOKEN_ENV_VARS};

/// Trait for providing bearer tokens to forge adapters.
///
/// # Implementation Notes
///
/// Implementors must never log or expose token values.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a valid bearer token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if no token is available
    /// - [`AuthError::InvalidToken`] if the token cannot be used in a header
    async fn bearer_token(&self) -> Result<String, AuthError>;

    /// Check if a token is available without fetching it.
    fn is_authenticated(&self) -> bool;
}
