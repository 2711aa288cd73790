//! In-memory [`GitHubApi`] for tests.
//!
//! [`FakeGitHub`] holds a small model of an organization, records every call
//! it receives, and applies mutations to its model so a second aggregation
//! observes what the reconciler changed. Individual operations can be made to
//! fail per repository.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::github::{
    BranchSummary, CodeScanningAnalysis, GitHubApi, GitHubError, RepositorySummary,
};
use crate::{BranchName, OrganizationName, Protection, ProtectionPolicy, RepositoryName, Setting};

/// Record of one call made against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCall {
    /// Operation name, e.g. `"update_branch_protection"`.
    pub operation: &'static str,
    /// Repository the call targeted; empty for organization-level calls.
    pub repo: String,
    /// Extra argument (branch, path, or issue title) when relevant.
    pub detail: Option<String>,
}

#[derive(Debug, Default)]
struct FakeRepo {
    summary: Option<RepositorySummary>,
    branches: Vec<BranchSummary>,
    protections: HashMap<String, Protection>,
    alerts_status: u16,
    analyses: Vec<CodeScanningAnalysis>,
    files: Vec<(String, String, String)>,
    issues: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct FakeState {
    order: Vec<String>,
    repos: HashMap<String, FakeRepo>,
    failures: HashSet<(&'static str, String)>,
    calls: Vec<FakeCall>,
}

/// In-memory GitHub organization.
#[derive(Debug)]
pub struct FakeGitHub {
    org: OrganizationName,
    state: Mutex<FakeState>,
}

impl FakeGitHub {
    /// Creates an organization with no repositories.
    pub fn new(org: &str) -> Self {
        Self {
            org: OrganizationName::new(org).expect("test org name"),
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Adds a repository with the given default branch and no branches.
    ///
    /// Dependabot alerts start disabled (status 404).
    pub fn with_repo(self, name: &str, private: bool, default_branch: Option<&str>) -> Self {
        {
            let mut state = self.state.lock().expect("fake state poisoned");
            state.order.push(name.to_string());
            state.repos.insert(
                name.to_string(),
                FakeRepo {
                    summary: Some(RepositorySummary {
                        name: RepositoryName::new(name).expect("test repo name"),
                        owner: self.org.clone(),
                        private,
                        default_branch: default_branch.and_then(BranchName::new),
                    }),
                    alerts_status: 404,
                    ..FakeRepo::default()
                },
            );
        }
        self
    }

    /// Adds an unprotected branch to a repository.
    pub fn with_branch(self, repo: &str, branch: &str) -> Self {
        self.edit(repo, |r| {
            r.branches.push(BranchSummary {
                name: BranchName::new(branch).expect("test branch name"),
                protected: false,
            });
        });
        self
    }

    /// Adds a protected branch with the given rules.
    pub fn with_protected_branch(self, repo: &str, branch: &str, protection: Protection) -> Self {
        self.edit(repo, |r| {
            r.branches.push(BranchSummary {
                name: BranchName::new(branch).expect("test branch name"),
                protected: true,
            });
            r.protections.insert(branch.to_string(), protection);
        });
        self
    }

    /// Sets the status returned by the vulnerability-alerts check.
    pub fn with_alerts_status(self, repo: &str, status: u16) -> Self {
        self.edit(repo, |r| r.alerts_status = status);
        self
    }

    /// Adds a code-scanning analysis record.
    pub fn with_analysis(self, repo: &str) -> Self {
        self.edit(repo, |r| {
            let id = r.analyses.len() as u64 + 1;
            r.analyses.push(CodeScanningAnalysis {
                id,
                git_ref: Some("refs/heads/main".to_string()),
                tool_name: Some("CodeQL".to_string()),
            });
        });
        self
    }

    /// Makes `operation` fail with a 500 for `repo` (use `""` for the
    /// organization listing).
    pub fn failing(self, operation: &'static str, repo: &str) -> Self {
        self.state
            .lock()
            .expect("fake state poisoned")
            .failures
            .insert((operation, repo.to_string()));
        self
    }

    /// Returns every recorded call.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.state.lock().expect("fake state poisoned").calls.clone()
    }

    /// Returns the recorded calls of one operation.
    pub fn calls_to(&self, operation: &str) -> Vec<FakeCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.operation == operation)
            .collect()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().expect("fake state poisoned").calls.clear();
    }

    /// Returns the files created in a repository as `(branch, path, content)`.
    pub fn files(&self, repo: &str) -> Vec<(String, String, String)> {
        self.state
            .lock()
            .expect("fake state poisoned")
            .repos
            .get(repo)
            .map(|r| r.files.clone())
            .unwrap_or_default()
    }

    /// Returns the issues opened in a repository as `(title, body)`.
    pub fn issues(&self, repo: &str) -> Vec<(String, String)> {
        self.state
            .lock()
            .expect("fake state poisoned")
            .repos
            .get(repo)
            .map(|r| r.issues.clone())
            .unwrap_or_default()
    }

    fn edit(&self, repo: &str, f: impl FnOnce(&mut FakeRepo)) {
        let mut state = self.state.lock().expect("fake state poisoned");
        let entry = state.repos.get_mut(repo).expect("repo added before editing");
        f(entry);
    }

    /// Records the call and returns the injected failure, if any.
    fn record(
        &self,
        operation: &'static str,
        repo: &str,
        detail: Option<String>,
    ) -> Result<(), GitHubError> {
        let mut state = self.state.lock().expect("fake state poisoned");
        state.calls.push(FakeCall {
            operation,
            repo: repo.to_string(),
            detail,
        });
        if state.failures.contains(&(operation, repo.to_string())) {
            return Err(GitHubError::Api {
                status: 500,
                message: format!("injected failure for {operation}"),
            });
        }
        Ok(())
    }

    fn with_repo_state<T>(
        &self,
        repo: &RepositoryName,
        f: impl FnOnce(&mut FakeRepo) -> T,
    ) -> Result<T, GitHubError> {
        let mut state = self.state.lock().expect("fake state poisoned");
        state
            .repos
            .get_mut(repo.as_str())
            .map(f)
            .ok_or_else(|| GitHubError::Api {
                status: 404,
                message: "Not Found".to_string(),
            })
    }
}

/// The protection GitHub reports after the policy has been written.
pub fn protection_from_policy(policy: &ProtectionPolicy) -> Protection {
    Protection {
        required_approving_review_count: Setting::Value(policy.required_approving_review_count),
        dismiss_stale_reviews: Setting::Value(policy.dismiss_stale_reviews),
        require_code_owner_reviews: Setting::Value(policy.require_code_owner_reviews),
        required_signatures: Setting::Value(false),
        enforce_admins: Setting::Value(policy.enforce_admins),
        required_linear_history: Setting::Value(false),
        allow_force_pushes: Setting::Value(false),
        allow_deletions: Setting::Value(false),
        block_creations: Setting::Value(false),
        required_conversation_resolution: Setting::Value(false),
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn list_org_repositories(
        &self,
        org: &OrganizationName,
    ) -> Result<Vec<RepositorySummary>, GitHubError> {
        self.record("list_org_repositories", "", Some(org.to_string()))?;
        let state = self.state.lock().expect("fake state poisoned");
        Ok(state
            .order
            .iter()
            .filter_map(|name| state.repos.get(name).and_then(|r| r.summary.clone()))
            .collect())
    }

    async fn list_branches(
        &self,
        _owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<Vec<BranchSummary>, GitHubError> {
        self.record("list_branches", repo.as_str(), None)?;
        self.with_repo_state(repo, |r| r.branches.clone())
    }

    async fn get_branch_protection(
        &self,
        _owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
    ) -> Result<Protection, GitHubError> {
        self.record("get_branch_protection", repo.as_str(), Some(branch.to_string()))?;
        self.with_repo_state(repo, |r| r.protections.get(branch.as_str()).cloned())?
            .ok_or_else(|| GitHubError::Api {
                status: 404,
                message: "Branch not protected".to_string(),
            })
    }

    async fn update_branch_protection(
        &self,
        _owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
        policy: &ProtectionPolicy,
    ) -> Result<(), GitHubError> {
        self.record(
            "update_branch_protection",
            repo.as_str(),
            Some(branch.to_string()),
        )?;
        self.with_repo_state(repo, |r| {
            for b in r.branches.iter_mut().filter(|b| b.name == *branch) {
                b.protected = true;
            }
            r.protections
                .insert(branch.to_string(), protection_from_policy(policy));
        })
    }

    async fn vulnerability_alerts_status(
        &self,
        _owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<u16, GitHubError> {
        self.record("vulnerability_alerts_status", repo.as_str(), None)?;
        self.with_repo_state(repo, |r| r.alerts_status)
    }

    async fn enable_vulnerability_alerts(
        &self,
        _owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<(), GitHubError> {
        self.record("enable_vulnerability_alerts", repo.as_str(), None)?;
        self.with_repo_state(repo, |r| r.alerts_status = 204)
    }

    async fn list_code_scanning_analyses(
        &self,
        _owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<Vec<CodeScanningAnalysis>, GitHubError> {
        self.record("list_code_scanning_analyses", repo.as_str(), None)?;
        self.with_repo_state(repo, |r| r.analyses.clone())
    }

    async fn create_file(
        &self,
        _owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
        path: &str,
        _message: &str,
        content: &str,
    ) -> Result<(), GitHubError> {
        self.record("create_file", repo.as_str(), Some(path.to_string()))?;
        self.with_repo_state(repo, |r| {
            if !r.branches.iter().any(|b| b.name == *branch) {
                r.branches.push(BranchSummary {
                    name: branch.clone(),
                    protected: false,
                });
            }
            if let Some(summary) = r.summary.as_mut() {
                summary.default_branch.get_or_insert_with(|| branch.clone());
            }
            r.files
                .push((branch.to_string(), path.to_string(), content.to_string()));
        })
    }

    async fn create_issue(
        &self,
        _owner: &OrganizationName,
        repo: &RepositoryName,
        title: &str,
        body: &str,
    ) -> Result<(), GitHubError> {
        self.record("create_issue", repo.as_str(), Some(title.to_string()))?;
        self.with_repo_state(repo, |r| r.issues.push((title.to_string(), body.to_string())))
    }
}
