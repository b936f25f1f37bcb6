//! auth::provider
//!
//! Token providers backed by a fixed value or the environment.
//!
//! # Example
//!
//! ```
//! use gitcms::auth::{EnvTokenProvider, TokenProvider};
//!
//! let provider = EnvTokenProvider::from_lookup(|name| {
//!     (name == "GITHUB_TOKEN").then(|| "ghp_example".to_string())
//! });
//! assert!(provider.is_authenticated());
//! assert_eq!(provider.source(), Some("GITHUB_TOKEN"));
//! ```

use super::errors::AuthError;
use super::TokenProvider;

/// Environment variables consulted for a token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITCMS_TOKEN", "GITHUB_TOKEN"];

/// A provider returning one fixed token.
pub struct StaticTokenProvider {
    token: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        checked(&self.token, "static token")
    }

    fn is_authenticated(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

/// A provider reading the first non-empty of [`TOKEN_ENV_VARS`].
///
/// The environment is read once, at construction.
pub struct EnvTokenProvider {
    token: Option<(&'static str, String)>,
}

impl std::fmt::Debug for EnvTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvTokenProvider")
            .field("source", &self.source())
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl EnvTokenProvider {
    /// Read the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let token = TOKEN_ENV_VARS.iter().find_map(|name| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (*name, v))
        });
        Self { token }
    }

    /// Name of the variable the token came from.
    pub fn source(&self) -> Option<&'static str> {
        self.token.as_ref().map(|(name, _)| *name)
    }
}

#[async_trait::async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        match &self.token {
            Some((name, token)) => checked(token, name),
            None => Err(AuthError::NotAuthenticated(TOKEN_ENV_VARS.join(" or "))),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Refuse tokens that would corrupt the Authorization header.
fn checked(token: &str, source: &str) -> Result<String, AuthError> {
    if token.trim().is_empty() {
        return Err(AuthError::NotAuthenticated(source.to_string()));
    }
    if token.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(AuthError::InvalidToken(format!(
            "{} contains whitespace or control characters",
            source
        )));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_token() {
        let provider = StaticTokenProvider::new("ghp_abc");
        assert_eq!(provider.bearer_token().await.unwrap(), "ghp_abc");
        assert!(provider.is_authenticated());
    }

    #[tokio::test]
    async fn static_provider_rejects_header_breaking_token() {
        let provider = StaticTokenProvider::new("ghp\nabc");
        let err = provider.bearer_token().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
        assert!(!err.to_string().contains("ghp"));
    }

    #[test]
    fn env_provider_prefers_gitcms_token() {
        let provider = EnvTokenProvider::from_lookup(|name| match name {
            "GITCMS_TOKEN" => Some("first".into()),
            "GITHUB_TOKEN" => Some("second".into()),
            _ => None,
        });
        assert_eq!(provider.source(), Some("GITCMS_TOKEN"));
    }

    #[test]
    fn env_provider_skips_blank_values() {
        let provider = EnvTokenProvider::from_lookup(|name| match name {
            "GITCMS_TOKEN" => Some("  ".into()),
            "GITHUB_TOKEN" => Some("second".into()),
            _ => None,
        });
        assert_eq!(provider.source(), Some("GITHUB_TOKEN"));
    }

    #[tokio::test]
    async fn env_provider_without_token() {
        let provider = EnvTokenProvider::from_lookup(|_| None);
        assert!(!provider.is_authenticated());
        let err = provider.bearer_token().await.unwrap_err();
        assert!(matches!(err, AuthError::NotAuthenticated(_)));
        assert!(err.to_string().contains("GITCMS_TOKEN or GITHUB_TOKEN"));
    }

    #[test]
    fn debug_redacts_tokens() {
        let provider = StaticTokenProvider::new("secret_token_xyz");
        assert!(!format!("{:?}", provider).contains("secret_token_xyz"));

        let provider = EnvTokenProvider::from_lookup(|_| Some("secret_token_xyz".into()));
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("secret_token_xyz"));
        assert!(debug.contains("GITCMS_TOKEN"));
    }
}
