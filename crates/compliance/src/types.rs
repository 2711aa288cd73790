//! Value types produced by the status aggregator and consumed by the
//! reconciler and report formatter.
//!
//! Everything here is transient: constructed fresh from live GitHub state at
//! the start of a run and discarded when the run ends. The reconciler changes
//! remote state, never these records; re-run the aggregator to observe the
//! effect of a reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BranchName, OrganizationName, RepositoryName, RunId};

// ---------------------------------------------------------------------------
// Protection settings
// ---------------------------------------------------------------------------

/// A single branch protection setting as observed on GitHub.
///
/// `Unknown` covers settings GitHub omitted from the response and branches
/// whose protection details could not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting<T> {
    /// The setting has a known value.
    Value(T),
    /// The value is unknown or not applicable.
    Unknown,
}

impl<T> Setting<T> {
    /// Returns the value if known.
    pub fn value(self) -> Option<T> {
        match self {
            Setting::Value(v) => Some(v),
            Setting::Unknown => None,
        }
    }
}

impl<T> From<Option<T>> for Setting<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Setting::Unknown, Setting::Value)
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Setting<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Setting::Value(v) => write!(f, "{v}"),
            Setting::Unknown => write!(f, "-"),
        }
    }
}

// ---------------------------------------------------------------------------

/// The protection rules configured on one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    /// Number of approving reviews required before merging.
    pub required_approving_review_count: Setting<u32>,
    /// Whether new commits dismiss existing approvals.
    pub dismiss_stale_reviews: Setting<bool>,
    /// Whether a code owner must approve.
    pub require_code_owner_reviews: Setting<bool>,
    /// Whether commits must be signed.
    pub required_signatures: Setting<bool>,
    /// Whether the rules also apply to administrators.
    pub enforce_admins: Setting<bool>,
    /// Whether merge commits are prohibited.
    pub required_linear_history: Setting<bool>,
    /// Whether force pushes are permitted.
    pub allow_force_pushes: Setting<bool>,
    /// Whether the branch may be deleted.
    pub allow_deletions: Setting<bool>,
    /// Whether creating matching branches is blocked.
    pub block_creations: Setting<bool>,
    /// Whether review conversations must be resolved before merging.
    pub required_conversation_resolution: Setting<bool>,
}

impl Protection {
    /// A protection record where every setting is [`Setting::Unknown`].
    pub fn unknown() -> Self {
        Self {
            required_approving_review_count: Setting::Unknown,
            dismiss_stale_reviews: Setting::Unknown,
            require_code_owner_reviews: Setting::Unknown,
            required_signatures: Setting::Unknown,
            enforce_admins: Setting::Unknown,
            required_linear_history: Setting::Unknown,
            allow_force_pushes: Setting::Unknown,
            allow_deletions: Setting::Unknown,
            block_creations: Setting::Unknown,
            required_conversation_resolution: Setting::Unknown,
        }
    }
}

/// Whether a branch is protected, and with which rules.
///
/// Protection details exist if and only if the branch is protected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "protection", rename_all = "snake_case")]
pub enum BranchProtectionState {
    /// No protection rules are configured.
    Unprotected,
    /// Protection rules are configured.
    Protected(Protection),
}

// ---------------------------------------------------------------------------
// Branch and repository records
// ---------------------------------------------------------------------------

/// One selected branch of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchStatus {
    /// Branch name.
    pub name: BranchName,
    /// Protection state at aggregation time.
    pub protection: BranchProtectionState,
}

impl BranchStatus {
    /// Creates a record for a branch with no protection.
    pub fn unprotected(name: BranchName) -> Self {
        Self {
            name,
            protection: BranchProtectionState::Unprotected,
        }
    }

    /// Returns `true` if the branch has protection rules.
    pub fn is_protected(&self) -> bool {
        matches!(self.protection, BranchProtectionState::Protected(_))
    }

    /// Returns the protection rules, if any.
    pub fn protection(&self) -> Option<&Protection> {
        match &self.protection {
            BranchProtectionState::Protected(p) => Some(p),
            BranchProtectionState::Unprotected => None,
        }
    }
}

/// Outcome of listing a repository's branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BranchListing {
    /// The listing succeeded; `total` counts every branch on the remote,
    /// not just the selected ones.
    Listed {
        /// Number of branches the repository has.
        total: usize,
    },
    /// The listing failed; the repository is skipped by the reconciler.
    Unavailable,
}

/// Aggregated compliance status of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    /// Repository name.
    pub name: RepositoryName,
    /// Owner login (the organization).
    pub owner: OrganizationName,
    /// Default branch name. `None` for an empty repository.
    pub default_branch: Option<BranchName>,
    /// Whether the repository is private.
    pub private: bool,
    /// Whether Dependabot vulnerability alerts are enabled.
    pub dependabot_vulnerability_alerts_enabled: bool,
    /// Whether at least one code-scanning analysis exists.
    pub code_scanning_has_data: bool,
    /// Outcome of the branch listing.
    pub branch_listing: BranchListing,
    /// Branches selected by the branch filter (or the default branch).
    pub branches: Vec<BranchStatus>,
}

impl RepositoryStatus {
    /// Returns the selected branch that is the repository's default branch.
    pub fn default_branch_status(&self) -> Option<&BranchStatus> {
        let default = self.default_branch.as_ref()?;
        self.branches
            .iter()
            .find(|b| b.name.eq_ignore_case(default.as_str()))
    }

    /// Returns `true` if the branch listing succeeded and found no branches.
    pub fn is_empty(&self) -> bool {
        matches!(self.branch_listing, BranchListing::Listed { total: 0 })
    }
}

// ---------------------------------------------------------------------------
// Run report
// ---------------------------------------------------------------------------

/// The aggregated status of an organization for one run.
///
/// Built once by the aggregator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run this report belongs to.
    pub run_id: RunId,
    /// When the report was generated.
    pub generated_at: Timestamp,
    /// Organization that was inspected.
    pub organization: OrganizationName,
    /// Repositories in the order the remote listing returned them.
    pub repositories: Vec<RepositoryStatus>,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
