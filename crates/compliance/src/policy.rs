//! The baseline branch protection policy and the bootstrap content for empty
//! repositories.
//!
//! Both are plain values injected into the [`crate::Reconciler`], so tests can
//! vary them without touching reconciliation logic.

use serde::{Deserialize, Serialize};

use crate::{BranchName, Protection, RepositoryName, Setting};

/// Protection rules written to a default branch.
///
/// Applied as a whole: the reconciler always writes every field, never a
/// partial patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionPolicy {
    /// Approving reviews required before merging.
    pub required_approving_review_count: u32,
    /// Dismiss approvals when new commits are pushed.
    pub dismiss_stale_reviews: bool,
    /// Require a code owner's approval.
    pub require_code_owner_reviews: bool,
    /// Apply the rules to administrators too.
    pub enforce_admins: bool,
    /// Require branches to be up to date before merging.
    pub strict_status_checks: bool,
    /// Status check contexts that must pass. Empty means none.
    pub required_status_checks: Vec<String>,
}

impl ProtectionPolicy {
    /// The organization-wide baseline.
    ///
    /// One approving review, stale reviews dismissed, code-owner review
    /// required, no dismissal restrictions, strict status checks with an empty
    /// check list, admins not enforced, no push restrictions.
    pub fn baseline() -> Self {
        Self {
            required_approving_review_count: 1,
            dismiss_stale_reviews: true,
            require_code_owner_reviews: true,
            enforce_admins: false,
            strict_status_checks: true,
            required_status_checks: Vec::new(),
        }
    }

    /// Returns `true` if the observed protection matches this policy on the
    /// settings the reconciler keeps in sync.
    ///
    /// Only the approving review count and the code-owner requirement are
    /// compared. An unknown value never satisfies the policy.
    pub fn is_satisfied_by(&self, protection: &Protection) -> bool {
        let reviews_ok = matches!(
            protection.required_approving_review_count,
            Setting::Value(n) if n >= self.required_approving_review_count
        );
        let code_owners_ok = matches!(
            protection.require_code_owner_reviews,
            Setting::Value(v) if v == self.require_code_owner_reviews
        );
        reviews_ok && code_owners_ok
    }
}

impl Default for ProtectionPolicy {
    fn default() -> Self {
        Self::baseline()
    }
}

// ---------------------------------------------------------------------------

/// What to commit to a repository that has no branches at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPolicy {
    /// Branch created by the bootstrap commit.
    pub branch: BranchName,
    /// Path of the generated file.
    pub path: String,
    /// Commit message of the bootstrap commit.
    pub commit_message: String,
}

impl BootstrapPolicy {
    /// Renders the README committed to a new repository.
    pub fn readme(&self, repo: &RepositoryName) -> String {
        format!(
            "# {repo}\n\
             This file has been auto-generated.\n\
             Check out these helpful links for getting started with your new repository:\n\
             \n\
             - [some-link](#)\n\
             - [some-other-link](#)"
        )
    }
}

impl Default for BootstrapPolicy {
    fn default() -> Self {
        Self {
            branch: BranchName::new("main").expect("literal branch name is non-empty"),
            path: "README.md".to_string(),
            commit_message: "Creates Default Branch".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protection(reviews: Setting<u32>, code_owners: Setting<bool>) -> Protection {
        Protection {
            required_approving_review_count: reviews,
            require_code_owner_reviews: code_owners,
            ..Protection::unknown()
        }
    }

    #[test]
    fn test_baseline_values() {
        let policy = ProtectionPolicy::baseline();
        assert_eq!(policy.required_approving_review_count, 1);
        assert!(policy.dismiss_stale_reviews);
        assert!(policy.require_code_owner_reviews);
        assert!(!policy.enforce_admins);
        assert!(policy.strict_status_checks);
        assert!(policy.required_status_checks.is_empty());
    }

    #[test]
    fn test_compliant_protection_satisfies_baseline() {
        let policy = ProtectionPolicy::baseline();
        assert!(policy.is_satisfied_by(&protection(Setting::Value(1), Setting::Value(true))));
        assert!(policy.is_satisfied_by(&protection(Setting::Value(3), Setting::Value(true))));
    }

    #[test]
    fn test_zero_reviews_is_out_of_sync() {
        let policy = ProtectionPolicy::baseline();
        assert!(!policy.is_satisfied_by(&protection(Setting::Value(0), Setting::Value(true))));
    }

    #[test]
    fn test_missing_code_owner_requirement_is_out_of_sync() {
        let policy = ProtectionPolicy::baseline();
        assert!(!policy.is_satisfied_by(&protection(Setting::Value(1), Setting::Value(false))));
    }

    #[test]
    fn test_unknown_settings_are_out_of_sync() {
        let policy = ProtectionPolicy::baseline();
        assert!(!policy.is_satisfied_by(&Protection::unknown()));
    }

    #[test]
    fn test_readme_embeds_repository_name() {
        let readme = BootstrapPolicy::default().readme(&RepositoryName::new("svc-b").unwrap());
        assert!(readme.starts_with("# svc-b\n"));
        assert!(readme.contains("auto-generated"));
    }
}
