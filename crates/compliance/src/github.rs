//! GitHub port: the capability interface the aggregator and reconciler use to
//! read and mutate remote state.
//!
//! The `github` crate implements [`GitHubApi`] over the REST API; tests use
//! [`crate::testing::FakeGitHub`]. Nothing in this module performs I/O.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BranchName, OrganizationName, Protection, ProtectionPolicy, RepositoryName};

/// HTTP status GitHub returns from the vulnerability-alerts check when alerts
/// are enabled.
pub const VULNERABILITY_ALERTS_ENABLED_STATUS: u16 = 204;

// ---------------------------------------------------------------------------
// Records returned by the port
// ---------------------------------------------------------------------------

/// A repository as returned by the organization listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// Repository name.
    pub name: RepositoryName,
    /// Owner login.
    pub owner: OrganizationName,
    /// Whether the repository is private.
    pub private: bool,
    /// Default branch; `None` when GitHub reports none.
    pub default_branch: Option<BranchName>,
}

/// A branch as returned by the branch listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchSummary {
    /// Branch name.
    pub name: BranchName,
    /// Whether GitHub reports the branch as protected.
    pub protected: bool,
}

/// One code-scanning analysis record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeScanningAnalysis {
    /// Analysis identifier.
    pub id: u64,
    /// Git ref the analysis ran against.
    pub git_ref: Option<String>,
    /// Name of the scanning tool.
    pub tool_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a single GitHub call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitHubError {
    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("GitHub request failed: {message}")]
    Request {
        /// Transport error description.
        message: String,
    },

    /// GitHub answered with a non-success status.
    #[error("GitHub API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// `message` field of the error body, or the raw body.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode GitHub response: {message}")]
    Decode {
        /// Decoder error description.
        message: String,
    },

    /// The app credentials could not be turned into an access token.
    #[error("GitHub authentication failed: {message}")]
    Authentication {
        /// Description of the authentication failure.
        message: String,
    },
}

impl GitHubError {
    /// Returns the HTTP status for [`GitHubError::Api`] failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Port trait
// ---------------------------------------------------------------------------

/// Authenticated access to the GitHub REST endpoints a compliance run needs.
///
/// Implementations handle pagination; every listing returns the complete
/// collection in the order GitHub returns it.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Lists every repository of an organization.
    async fn list_org_repositories(
        &self,
        org: &OrganizationName,
    ) -> Result<Vec<RepositorySummary>, GitHubError>;

    /// Lists every branch of a repository.
    async fn list_branches(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<Vec<BranchSummary>, GitHubError>;

    /// Fetches the protection rules of a protected branch.
    async fn get_branch_protection(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
    ) -> Result<Protection, GitHubError>;

    /// Writes the complete policy as the branch's protection rules.
    ///
    /// This replaces the existing rules; it is not a partial update.
    async fn update_branch_protection(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
        policy: &ProtectionPolicy,
    ) -> Result<(), GitHubError>;

    /// Returns the raw HTTP status of the vulnerability-alerts check.
    ///
    /// GitHub answers 204 when alerts are enabled and 404 when they are not;
    /// both are returned as `Ok`.
    async fn vulnerability_alerts_status(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<u16, GitHubError>;

    /// Enables Dependabot vulnerability alerts.
    async fn enable_vulnerability_alerts(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<(), GitHubError>;

    /// Lists recent code-scanning analyses.
    async fn list_code_scanning_analyses(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<Vec<CodeScanningAnalysis>, GitHubError>;

    /// Creates a file on a branch, creating the branch if the repository is
    /// empty. `content` is plain text; encoding is the implementation's job.
    async fn create_file(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
        path: &str,
        message: &str,
        content: &str,
    ) -> Result<(), GitHubError>;

    /// Opens an issue.
    async fn create_issue(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
        title: &str,
        body: &str,
    ) -> Result<(), GitHubError>;
}
