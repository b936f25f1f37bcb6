//! forge::github
//!
//! GitHub forge implementation over the GraphQL API.
//!
//! # Design
//!
//! Both operations are single GraphQL requests:
//! - the branch tip is read with `repository { ref(qualifiedName) { target { oid } } }`
//! - commits are created with the `createCommitOnBranch` mutation, which
//!   applies all file changes atomically and checks `expectedHeadOid`
//!
//! GraphQL reports most failures as HTTP 200 with an `errors` array. Those
//! are classified by their `type` and message; a stale head becomes
//! [`ForgeError::StaleHead`] and is never folded into a generic error.
//!
//! # Authentication
//!
//! A [`TokenProvider`] is asked for the bearer token on every request. An
//! auth failure is returned to the caller as is; no request is ever sent
//! twice.
//!
//! # Rate Limiting
//!
//! Returns `ForgeError::RateLimited` when limits are hit. No automatic retry.
//!
//! # Example
//!
//! ```ignore
//! use gitcms::auth::EnvTokenProvider;
//! use gitcms::forge::github::GitHubForge;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let forge = GitHubForge::new(Arc::new(EnvTokenProvider::from_env()), Duration::from_secs(30))?;
//! let tip = forge.fetch_head_oid(&repo, &branch).await?;
//! ```
//!
//! [`TokenProvider`]: crate::auth::TokenProvider

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::traits::{Forge, ForgeError};
use crate::auth::{AuthError, TokenProvider};
use crate::commit::CommitInput;
use crate::core::config::DEFAULT_GRAPHQL_URL;
use crate::core::types::{BranchName, Oid, RepoId};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("gitcms/", env!("CARGO_PKG_VERSION"));

const HEAD_QUERY: &str = r#"query($owner: String!, $name: String!, $qualifiedName: String!) {
  repository(owner: $owner, name: $name) {
    ref(qualifiedName: $qualifiedName) {
      target { oid }
    }
  }
}"#;

const CREATE_COMMIT_MUTATION: &str = r#"mutation($input: CreateCommitOnBranchInput!) {
  createCommitOnBranch(input: $input) {
    commit { oid }
  }
}"#;

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client, carrying the request timeout
    client: Client,
    /// Source of the bearer token
    token_provider: Arc<dyn TokenProvider>,
    /// GraphQL endpoint (configurable for GitHub Enterprise and tests)
    graphql_url: String,
    timeout: Duration,
}

// Custom Debug to avoid exposing the token provider
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("graphql_url", &self.graphql_url)
            .field("timeout", &self.timeout)
            .field("authenticated", &self.token_provider.is_authenticated())
            .finish()
    }
}

impl GitHubForge {
    /// Create a forge against the public GitHub endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ForgeError::NetworkError` if the HTTP client cannot be built.
    pub fn new(provider: Arc<dyn TokenProvider>, timeout: Duration) -> Result<Self, ForgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            token_provider: provider,
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            timeout,
        })
    }

    /// Use a different GraphQL endpoint.
    pub fn with_graphql_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_url = url.into();
        self
    }

    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    /// Get the current bearer token.
    async fn get_bearer_token(&self) -> Result<String, ForgeError> {
        self.token_provider
            .bearer_token()
            .await
            .map_err(|e| match e {
                AuthError::NotAuthenticated(_) => ForgeError::AuthRequired,
                AuthError::InvalidToken(_) => ForgeError::AuthFailed(e.to_string()),
            })
    }

    /// Build common headers for API requests.
    async fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let token = self.get_bearer_token().await?;
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn transport_error(&self, err: reqwest::Error) -> ForgeError {
        if err.is_timeout() {
            ForgeError::Timeout(self.timeout)
        } else {
            ForgeError::NetworkError(err.to_string())
        }
    }

    /// Send one GraphQL document and return its `data`.
    async fn graphql<T: DeserializeOwned>(
        &self,
        body: &serde_json::Value,
        expected: Option<&Oid>,
    ) -> Result<T, ForgeError> {
        let response = self
            .client
            .post(&self.graphql_url)
            .headers(self.headers().await?)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::handle_error_response(response, status).await);
        }

        let result: GraphQLResponse<T> =
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse GraphQL response: {}", e),
            })?;

        if let Some(err) = result
            .errors
            .as_deref()
            .and_then(|errors| classify_graphql_errors(errors, expected))
        {
            return Err(err);
        }

        result.data.ok_or_else(|| ForgeError::ApiError {
            status: status.as_u16(),
            message: "GraphQL response has neither data nor errors".into(),
        })
    }

    /// Handle a non-success HTTP response from the API.
    async fn handle_error_response(response: Response, status: StatusCode) -> ForgeError {
        // Read headers before consuming the body.
        let rate_limit_exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false);

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limit_exhausted => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

/// Whether a GraphQL error reports that the branch moved.
fn is_stale(error: &GraphQLError) -> bool {
    error.kind.as_deref() == Some("STALE_DATA")
        || error.message.starts_with("Expected branch to point to")
}

/// Map the errors of one GraphQL response to a single `ForgeError`.
///
/// A stale-head error anywhere in a mutation response wins, so a conflict
/// is never reported as a plain failure. Otherwise the first error decides.
fn classify_graphql_errors(errors: &[GraphQLError], expected: Option<&Oid>) -> Option<ForgeError> {
    let chosen = match expected {
        Some(_) => errors.iter().find(|e| is_stale(e)).or_else(|| errors.first()),
        None => errors.first(),
    };
    chosen.map(|error| classify_graphql_error(error, expected))
}

/// Map a GraphQL error to a `ForgeError`.
///
/// `expected` is the head a mutation was built against; it is `None` for
/// queries, which cannot be stale.
fn classify_graphql_error(error: &GraphQLError, expected: Option<&Oid>) -> ForgeError {
    let message = error.message.clone();

    match (error.kind.as_deref(), expected) {
        (_, Some(expected)) if is_stale(error) => ForgeError::StaleHead {
            expected: expected.clone(),
        },
        (Some("NOT_FOUND"), _) => ForgeError::NotFound(message),
        (Some("RATE_LIMITED"), _) => ForgeError::RateLimited,
        (Some("FORBIDDEN"), _) if message.to_lowercase().contains("protected branch") => {
            ForgeError::RemoteRejected(message)
        }
        (Some("FORBIDDEN"), _) => ForgeError::AuthFailed(message),
        (_, Some(_)) => ForgeError::RemoteRejected(message),
        (_, None) => ForgeError::ApiError {
            status: 200,
            message,
        },
    }
}

fn parse_oid(raw: &str) -> Result<Oid, ForgeError> {
    Oid::new(raw).map_err(|e| ForgeError::ApiError {
        status: 200,
        message: format!("GitHub returned an unusable commit id: {}", e),
    })
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn fetch_head_oid(&self, repo: &RepoId, branch: &BranchName) -> Result<Oid, ForgeError> {
        let body = serde_json::json!({
            "query": HEAD_QUERY,
            "variables": {
                "owner": repo.owner(),
                "name": repo.name(),
                "qualifiedName": branch.qualified(),
            }
        });

        let data: HeadData = self.graphql(&body, None).await?;
        let repository = data
            .repository
            .ok_or_else(|| ForgeError::NotFound(format!("repository {}", repo)))?;
        let target = repository
            .git_ref
            .and_then(|r| r.target)
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}' in {}", branch, repo)))?;
        parse_oid(&target.oid)
    }

    async fn create_commit_on_branch(&self, input: &CommitInput) -> Result<Oid, ForgeError> {
        let body = serde_json::json!({
            "query": CREATE_COMMIT_MUTATION,
            "variables": { "input": input }
        });

        let data: CreateCommitData = self
            .graphql(&body, Some(input.expected_head_oid()))
            .await?;
        let commit = data
            .create_commit_on_branch
            .and_then(|payload| payload.commit)
            .ok_or_else(|| ForgeError::ApiError {
                status: 200,
                message: "createCommitOnBranch returned no commit".into(),
            })?;
        parse_oid(&commit.oid)
    }
}

// =============================================================================
// GitHub API response types
// =============================================================================

/// GitHub REST-style error body.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// GraphQL response envelope.
#[derive(Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error format.
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct HeadData {
    repository: Option<HeadRepository>,
}

#[derive(Deserialize)]
struct HeadRepository {
    #[serde(rename = "ref")]
    git_ref: Option<GitRef>,
}

#[derive(Deserialize)]
struct GitRef {
    target: Option<CommitOid>,
}

#[derive(Deserialize)]
struct CommitOid {
    oid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommitData {
    create_commit_on_branch: Option<CreateCommitPayload>,
}

#[derive(Deserialize)]
struct CreateCommitPayload {
    commit: Option<CommitOid>,
}
