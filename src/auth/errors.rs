//! auth::errors
//!
//! Authentication error types.
//!
//! # Design
//!
//! Error messages MUST NOT contain tokens. All error variants provide useful
//! context without exposing sensitive data.
//!
//! # Example
//!
//! ```
//! use gitcms::auth::AuthError;
//!
//! let err = AuthError::NotAuthenticated("GITCMS_TOKEN".to_string());
//! assert!(err.to_string().contains("GITCMS_TOKEN"));
//! ```

use thiserror::Error;

/// Errors from authentication operations.
///
/// # Security
///
/// Error messages intentionally do not include token values.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential is available.
    #[error("not authenticated: set {0} to a GitHub access token")]
    NotAuthenticated(String),

    /// The credential exists but is malformed.
    #[error("invalid token: {0}")]
    InvalidToken(String),
}
