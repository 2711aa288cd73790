//! Partial GitHub REST payloads.
//!
//! Only the fields ghwatcher reads or writes are modelled; everything else in
//! the responses is ignored.

use serde::{Deserialize, Serialize};

use compliance::github::{BranchSummary, CodeScanningAnalysis, RepositorySummary};
use compliance::{BranchName, OrganizationName, Protection, ProtectionPolicy, RepositoryName, Setting};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OwnerResponse {
    pub login: String,
}

/// Entry of `GET /orgs/{org}/repos`.
#[derive(Debug, Deserialize)]
pub struct RepoResponse {
    pub name: String,
    pub owner: OwnerResponse,
    #[serde(default)]
    pub private: bool,
    pub default_branch: Option<String>,
}

impl RepoResponse {
    /// Converts to the port record; `None` if GitHub returned an empty name.
    pub fn into_summary(self) -> Option<RepositorySummary> {
        Some(RepositorySummary {
            name: RepositoryName::new(self.name)?,
            owner: OrganizationName::new(self.owner.login)?,
            private: self.private,
            default_branch: self.default_branch.and_then(BranchName::new),
        })
    }
}

/// Entry of `GET /repos/{owner}/{repo}/branches`.
#[derive(Debug, Deserialize)]
pub struct BranchResponse {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
}

impl BranchResponse {
    pub fn into_summary(self) -> Option<BranchSummary> {
        Some(BranchSummary {
            name: BranchName::new(self.name)?,
            protected: self.protected,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct EnabledFlag {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestReviewsResponse {
    pub required_approving_review_count: Option<u32>,
    pub dismiss_stale_reviews: Option<bool>,
    pub require_code_owner_reviews: Option<bool>,
}

/// Body of `GET /repos/{owner}/{repo}/branches/{branch}/protection`.
#[derive(Debug, Deserialize)]
pub struct ProtectionResponse {
    pub required_pull_request_reviews: Option<PullRequestReviewsResponse>,
    pub required_signatures: Option<EnabledFlag>,
    pub enforce_admins: Option<EnabledFlag>,
    pub required_linear_history: Option<EnabledFlag>,
    pub allow_force_pushes: Option<EnabledFlag>,
    pub allow_deletions: Option<EnabledFlag>,
    pub block_creations: Option<EnabledFlag>,
    pub required_conversation_resolution: Option<EnabledFlag>,
}

fn flag(value: Option<EnabledFlag>) -> Setting<bool> {
    value.map(|f| f.enabled).into()
}

impl From<ProtectionResponse> for Protection {
    fn from(r: ProtectionResponse) -> Self {
        let reviews = r.required_pull_request_reviews;
        Protection {
            required_approving_review_count: reviews
                .as_ref()
                .and_then(|p| p.required_approving_review_count)
                .into(),
            dismiss_stale_reviews: reviews
                .as_ref()
                .and_then(|p| p.dismiss_stale_reviews)
                .into(),
            require_code_owner_reviews: reviews
                .as_ref()
                .and_then(|p| p.require_code_owner_reviews)
                .into(),
            required_signatures: flag(r.required_signatures),
            enforce_admins: flag(r.enforce_admins),
            required_linear_history: flag(r.required_linear_history),
            allow_force_pushes: flag(r.allow_force_pushes),
            allow_deletions: flag(r.allow_deletions),
            block_creations: flag(r.block_creations),
            required_conversation_resolution: flag(r.required_conversation_resolution),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalysisTool {
    pub name: Option<String>,
}

/// Entry of `GET /repos/{owner}/{repo}/code-scanning/analyses`.
#[derive(Debug, Deserialize)]
pub struct AnalysisResponse {
    pub id: u64,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub tool: Option<AnalysisTool>,
}

impl From<AnalysisResponse> for CodeScanningAnalysis {
    fn from(r: AnalysisResponse) -> Self {
        CodeScanningAnalysis {
            id: r.id,
            git_ref: r.git_ref,
            tool_name: r.tool.and_then(|t| t.name),
        }
    }
}

/// Body of `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Deserialize)]
pub struct InstallationTokenResponse {
    pub token: String,
}

/// Error body GitHub attaches to 4xx/5xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, PartialEq)]
pub struct StatusCheck {
    pub context: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RequiredStatusChecks {
    pub strict: bool,
    pub checks: Vec<StatusCheck>,
}

/// Serialized as `{}`: nobody is restricted from dismissing reviews.
#[derive(Debug, Serialize, PartialEq)]
pub struct DismissalRestrictions {}

#[derive(Debug, Serialize, PartialEq)]
pub struct RequiredPullRequestReviews {
    pub dismissal_restrictions: DismissalRestrictions,
    pub dismiss_stale_reviews: bool,
    pub require_code_owner_reviews: bool,
    pub required_approving_review_count: u32,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PushRestrictions {
    pub users: Vec<String>,
    pub teams: Vec<String>,
}

/// Body of `PUT /repos/{owner}/{repo}/branches/{branch}/protection`.
#[derive(Debug, Serialize, PartialEq)]
pub struct UpdateProtectionRequest {
    pub required_status_checks: RequiredStatusChecks,
    pub enforce_admins: bool,
    pub required_pull_request_reviews: RequiredPullRequestReviews,
    /// Always `null`: no push restrictions.
    pub restrictions: Option<PushRestrictions>,
}

impl From<&ProtectionPolicy> for UpdateProtectionRequest {
    fn from(policy: &ProtectionPolicy) -> Self {
        Self {
            required_status_checks: RequiredStatusChecks {
                strict: policy.strict_status_checks,
                checks: policy
                    .required_status_checks
                    .iter()
                    .map(|context| StatusCheck {
                        context: context.clone(),
                    })
                    .collect(),
            },
            enforce_admins: policy.enforce_admins,
            required_pull_request_reviews: RequiredPullRequestReviews {
                dismissal_restrictions: DismissalRestrictions {},
                dismiss_stale_reviews: policy.dismiss_stale_reviews,
                require_code_owner_reviews: policy.require_code_owner_reviews,
                required_approving_review_count: policy.required_approving_review_count,
            },
            restrictions: None,
        }
    }
}

/// Body of `PUT /repos/{owner}/{repo}/contents/{path}`.
#[derive(Debug, Serialize)]
pub struct CreateFileRequest<'a> {
    pub message: &'a str,
    /// Base64-encoded file content.
    pub content: String,
    pub branch: &'a str,
}

/// Body of `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Serialize)]
pub struct CreateIssueRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_baseline_request_body() {
        let body = serde_json::to_value(UpdateProtectionRequest::from(&ProtectionPolicy::baseline()))
            .unwrap();

        assert_eq!(
            body,
            json!({
                "required_status_checks": { "strict": true, "checks": [] },
                "enforce_admins": false,
                "required_pull_request_reviews": {
                    "dismissal_restrictions": {},
                    "dismiss_stale_reviews": true,
                    "require_code_owner_reviews": true,
                    "required_approving_review_count": 1
                },
                "restrictions": null
            })
        );
    }

    #[test]
    fn test_protection_response_maps_missing_sections_to_unknown() {
        let response: ProtectionResponse = serde_json::from_value(json!({
            "url": "https://api.github.com/repos/acme/svc-a/branches/main/protection",
            "enforce_admins": { "url": "…", "enabled": true },
            "allow_force_pushes": { "enabled": false }
        }))
        .unwrap();

        let protection = Protection::from(response);

        assert_eq!(protection.enforce_admins, Setting::Value(true));
        assert_eq!(protection.allow_force_pushes, Setting::Value(false));
        assert_eq!(protection.required_approving_review_count, Setting::Unknown);
        assert_eq!(protection.block_creations, Setting::Unknown);
    }

    #[test]
    fn test_repo_without_default_branch() {
        let response: RepoResponse = serde_json::from_value(json!({
            "name": "fresh",
            "owner": { "login": "acme" },
            "private": false,
            "default_branch": null
        }))
        .unwrap();

        let summary = response.into_summary().unwrap();
        assert!(summary.default_branch.is_none());
    }
}
