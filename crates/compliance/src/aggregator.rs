//! Status aggregation: read the compliance-relevant state of an organization.
//!
//! For every retained repository the aggregator records Dependabot status,
//! code-scanning presence, and the protection of the selected branches. All
//! remote calls are awaited one after another in listing order. Per-repository
//! failures degrade to empty/false values and are logged; only a failure to
//! list the organization's repositories aborts aggregation.

use tracing::{debug, info, warn};

use crate::config::{NameList, RunConfig};
use crate::github::{
    BranchSummary, CodeScanningAnalysis, GitHubApi, GitHubError, RepositorySummary,
    VULNERABILITY_ALERTS_ENABLED_STATUS,
};
use crate::{
    BranchListing, BranchName, BranchProtectionState, BranchStatus, ComplianceError,
    OrganizationName, Protection, RepositoryName, RepositoryStatus, RunId, RunReport, Timestamp,
};

/// Which repositories and branches an aggregation covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationScope {
    /// Organization to list.
    pub organization: OrganizationName,
    /// Keep only the repository with this name (case-insensitive).
    pub repository_filter: Option<RepositoryName>,
    /// Select this branch instead of the default branch (case-insensitive).
    pub branch_filter: Option<BranchName>,
    /// Include private repositories.
    pub enforce_private: bool,
    /// Repositories to leave out.
    pub skip_list: NameList,
}

impl AggregationScope {
    /// Derives the scope from the run configuration.
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            organization: config.organization.clone(),
            repository_filter: config.repository_filter.clone(),
            branch_filter: config.branch_filter.clone(),
            enforce_private: config.enforce_private,
            skip_list: config.skip_list.clone(),
        }
    }
}

/// Maps the vulnerability-alerts check to an enabled flag.
///
/// Only a 204 means enabled; every other status and every error means
/// disabled.
pub fn dependabot_enabled(status: &Result<u16, GitHubError>) -> bool {
    matches!(status, Ok(s) if *s == VULNERABILITY_ALERTS_ENABLED_STATUS)
}

/// Maps the code-scanning listing to a has-data flag.
pub fn code_scanning_has_data(analyses: &Result<Vec<CodeScanningAnalysis>, GitHubError>) -> bool {
    matches!(analyses, Ok(list) if !list.is_empty())
}

/// Reads organization state through a [`GitHubApi`].
pub struct StatusAggregator<'a> {
    client: &'a dyn GitHubApi,
    scope: AggregationScope,
}

impl<'a> StatusAggregator<'a> {
    /// Creates an aggregator over `client` for `scope`.
    pub fn new(client: &'a dyn GitHubApi, scope: AggregationScope) -> Self {
        Self { client, scope }
    }

    /// Builds a fresh [`RunReport`] from live state.
    pub async fn collect(&self, run_id: RunId) -> Result<RunReport, ComplianceError> {
        let org = &self.scope.organization;
        let listing = self
            .client
            .list_org_repositories(org)
            .await
            .map_err(|source| ComplianceError::RepositoryListing {
                organization: org.clone(),
                source,
            })?;

        let mut repositories = Vec::new();
        for summary in listing.iter().filter(|r| self.matches_filter(r)) {
            if let Some(reason) = self.exclusion(summary) {
                info!(org = %org, repo = %summary.name, reason, "Skipping repository");
                continue;
            }
            repositories.push(self.inspect(summary).await);
        }

        debug!(org = %org, count = repositories.len(), "Aggregated repository status");
        Ok(RunReport {
            run_id,
            generated_at: Timestamp::now(),
            organization: org.clone(),
            repositories,
        })
    }

    fn matches_filter(&self, repo: &RepositorySummary) -> bool {
        self.scope
            .repository_filter
            .as_ref()
            .map_or(true, |wanted| repo.name.eq_ignore_case(wanted.as_str()))
    }

    fn exclusion(&self, repo: &RepositorySummary) -> Option<&'static str> {
        if repo.private && !self.scope.enforce_private {
            return Some("private repository");
        }
        if self.scope.skip_list.contains(repo.name.as_str()) {
            return Some("listed in skip list");
        }
        None
    }

    async fn inspect(&self, repo: &RepositorySummary) -> RepositoryStatus {
        let owner = &repo.owner;
        let name = &repo.name;

        let alerts = self.client.vulnerability_alerts_status(owner, name).await;
        if let Err(err) = &alerts {
            debug!(org = %owner, repo = %name, error = %err, "Vulnerability alert check failed");
        }

        let analyses = self.client.list_code_scanning_analyses(owner, name).await;
        if let Err(err) = &analyses {
            warn!(org = %owner, repo = %name, error = %err, "Code scanning analyses unavailable");
        }

        let (branch_listing, branches) = match self.client.list_branches(owner, name).await {
            Ok(all) => {
                let total = all.len();
                let selected = self.select_branches(repo, &all).await;
                (BranchListing::Listed { total }, selected)
            }
            Err(err) => {
                warn!(org = %owner, repo = %name, error = %err, "Failed to list branches");
                (BranchListing::Unavailable, Vec::new())
            }
        };

        RepositoryStatus {
            name: name.clone(),
            owner: owner.clone(),
            default_branch: repo.default_branch.clone(),
            private: repo.private,
            dependabot_vulnerability_alerts_enabled: dependabot_enabled(&alerts),
            code_scanning_has_data: code_scanning_has_data(&analyses),
            branch_listing,
            branches,
        }
    }

    async fn select_branches(
        &self,
        repo: &RepositorySummary,
        all: &[BranchSummary],
    ) -> Vec<BranchStatus> {
        let Some(target) = self
            .scope
            .branch_filter
            .as_ref()
            .or(repo.default_branch.as_ref())
        else {
            return Vec::new();
        };

        let mut selected = Vec::new();
        for branch in all.iter().filter(|b| b.name.eq_ignore_case(target.as_str())) {
            let protection = if branch.protected {
                BranchProtectionState::Protected(self.protection_of(repo, &branch.name).await)
            } else {
                BranchProtectionState::Unprotected
            };
            selected.push(BranchStatus {
                name: branch.name.clone(),
                protection,
            });
        }
        selected
    }

    async fn protection_of(&self, repo: &RepositorySummary, branch: &BranchName) -> Protection {
        match self
            .client
            .get_branch_protection(&repo.owner, &repo.name, branch)
            .await
        {
            Ok(protection) => protection,
            Err(err) => {
                warn!(
                    org = %repo.owner,
                    repo = %repo.name,
                    branch = %branch,
                    error = %err,
                    "Failed to fetch branch protection details"
                );
                Protection::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGitHub;
    use crate::Setting;

    fn scope() -> AggregationScope {
        AggregationScope {
            organization: OrganizationName::new("acme").unwrap(),
            repository_filter: None,
            branch_filter: None,
            enforce_private: false,
            skip_list: NameList::default(),
        }
    }

    fn protected() -> Protection {
        Protection {
            required_approving_review_count: Setting::Value(2),
            require_code_owner_reviews: Setting::Value(true),
            ..Protection::unknown()
        }
    }

    async fn collect(fake: &FakeGitHub, scope: AggregationScope) -> RunReport {
        StatusAggregator::new(fake, scope)
            .collect(RunId::new_random())
            .await
            .unwrap()
    }

    fn names(report: &RunReport) -> Vec<&str> {
        report.repositories.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_dependabot_status_mapping() {
        assert!(dependabot_enabled(&Ok(204)));
        assert!(!dependabot_enabled(&Ok(404)));
        assert!(!dependabot_enabled(&Ok(200)));
        assert!(!dependabot_enabled(&Err(GitHubError::Request {
            message: "connection reset".to_string()
        })));
    }

    #[test]
    fn test_code_scanning_mapping() {
        let analysis = CodeScanningAnalysis {
            id: 1,
            git_ref: None,
            tool_name: None,
        };
        assert!(code_scanning_has_data(&Ok(vec![analysis])));
        assert!(!code_scanning_has_data(&Ok(vec![])));
        assert!(!code_scanning_has_data(&Err(GitHubError::Api {
            status: 403,
            message: "Advanced Security must be enabled".to_string()
        })));
    }

    #[tokio::test]
    async fn test_report_preserves_listing_order() {
        let fake = FakeGitHub::new("acme")
            .with_repo("zeta", false, Some("main"))
            .with_repo("alpha", false, Some("main"))
            .with_repo("mid", false, Some("main"));

        let report = collect(&fake, scope()).await;

        assert_eq!(names(&report), vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_private_repos_skipped_unless_enforced() {
        let fake = FakeGitHub::new("acme")
            .with_repo("public", false, Some("main"))
            .with_repo("secret", true, Some("main"));

        let report = collect(&fake, scope()).await;
        assert_eq!(names(&report), vec!["public"]);

        let mut enforcing = scope();
        enforcing.enforce_private = true;
        let report = collect(&fake, enforcing).await;
        assert_eq!(names(&report), vec!["public", "secret"]);
    }

    #[tokio::test]
    async fn test_skip_listed_repos_are_excluded() {
        let fake = FakeGitHub::new("acme")
            .with_repo("svc-a", false, Some("main"))
            .with_repo("legacy", false, Some("main"))
            .with_repo("Legacy-2", false, Some("main"));

        let mut skipping = scope();
        skipping.skip_list = NameList::parse("legacy, legacy-2");
        let report = collect(&fake, skipping).await;

        assert_eq!(names(&report), vec!["svc-a", "Legacy-2"]);
        assert!(fake
            .calls()
            .iter()
            .all(|c| c.repo != "legacy" || c.operation == "list_org_repositories"));
    }

    #[tokio::test]
    async fn test_repository_filter_is_case_insensitive() {
        let fake = FakeGitHub::new("acme")
            .with_repo("svc-a", false, Some("main"))
            .with_repo("svc-b", false, Some("main"));

        let mut filtered = scope();
        filtered.repository_filter = RepositoryName::new("SVC-B");
        let report = collect(&fake, filtered).await;

        assert_eq!(names(&report), vec!["svc-b"]);
    }

    #[tokio::test]
    async fn test_default_branch_selected_with_protection_details() {
        let fake = FakeGitHub::new("acme")
            .with_repo("svc-a", false, Some("main"))
            .with_protected_branch("svc-a", "main", protected())
            .with_branch("svc-a", "feature/x")
            .with_alerts_status("svc-a", 204)
            .with_analysis("svc-a");

        let report = collect(&fake, scope()).await;
        let repo = &report.repositories[0];

        assert!(repo.dependabot_vulnerability_alerts_enabled);
        assert!(repo.code_scanning_has_data);
        assert_eq!(repo.branch_listing, BranchListing::Listed { total: 2 });
        assert_eq!(repo.branches.len(), 1);
        assert_eq!(repo.branches[0].protection(), Some(&protected()));
    }

    #[tokio::test]
    async fn test_unprotected_branch_skips_protection_fetch() {
        let fake = FakeGitHub::new("acme")
            .with_repo("svc-a", false, Some("main"))
            .with_branch("svc-a", "main");

        let report = collect(&fake, scope()).await;

        assert!(!report.repositories[0].branches[0].is_protected());
        assert!(fake.calls_to("get_branch_protection").is_empty());
    }

    #[tokio::test]
    async fn test_branch_filter_overrides_default_branch() {
        let fake = FakeGitHub::new("acme")
            .with_repo("svc-a", false, Some("main"))
            .with_branch("svc-a", "main")
            .with_branch("svc-a", "Develop");

        let mut filtered = scope();
        filtered.branch_filter = BranchName::new("develop");
        let report = collect(&fake, filtered).await;

        let branches = &report.repositories[0].branches;
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name.as_str(), "Develop");
    }

    #[tokio::test]
    async fn test_branch_listing_failure_is_isolated() {
        let fake = FakeGitHub::new("acme")
            .with_repo("broken", false, Some("main"))
            .with_branch("broken", "main")
            .with_repo("healthy", false, Some("main"))
            .with_branch("healthy", "main")
            .failing("list_branches", "broken");

        let report = collect(&fake, scope()).await;

        assert_eq!(report.repositories[0].branch_listing, BranchListing::Unavailable);
        assert!(report.repositories[0].branches.is_empty());
        assert_eq!(report.repositories[1].branches.len(), 1);
    }

    #[tokio::test]
    async fn test_protection_fetch_failure_yields_unknown_settings() {
        let fake = FakeGitHub::new("acme")
            .with_repo("svc-a", false, Some("main"))
            .with_protected_branch("svc-a", "main", protected())
            .failing("get_branch_protection", "svc-a");

        let report = collect(&fake, scope()).await;
        let branch = &report.repositories[0].branches[0];

        assert!(branch.is_protected());
        assert_eq!(branch.protection(), Some(&Protection::unknown()));
    }

    #[tokio::test]
    async fn test_alert_and_scanning_failures_degrade_to_false() {
        let fake = FakeGitHub::new("acme")
            .with_repo("svc-a", false, Some("main"))
            .with_alerts_status("svc-a", 204)
            .with_analysis("svc-a")
            .failing("vulnerability_alerts_status", "svc-a")
            .failing("list_code_scanning_analyses", "svc-a");

        let report = collect(&fake, scope()).await;

        assert!(!report.repositories[0].dependabot_vulnerability_alerts_enabled);
        assert!(!report.repositories[0].code_scanning_has_data);
    }

    #[tokio::test]
    async fn test_repository_listing_failure_is_fatal() {
        let fake = FakeGitHub::new("acme")
            .with_repo("svc-a", false, Some("main"))
            .failing("list_org_repositories", "");

        let result = StatusAggregator::new(&fake, scope())
            .collect(RunId::new_random())
            .await;

        assert!(matches!(
            result,
            Err(ComplianceError::RepositoryListing { .. })
        ));
    }
}
