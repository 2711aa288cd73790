//! Run configuration parsed from environment-style inputs.
//!
//! Parsing is a pure function over a lookup closure so it can be unit-tested
//! without touching the process environment. The CLI passes
//! `|key| std::env::var(key).ok()`.
//!
//! | Env Var                        | Required        | Effect |
//! |--------------------------------|-----------------|--------|
//! | `GHWATCHER_ALLOWED_ORG_LIST`   | **yes**         | organizations this job may touch |
//! | `GHWATCHER_CHECK_ORG`          | **yes**         | organization to process |
//! | `GHWATCHER_CHECK_REPO`         | no              | restrict to one repository |
//! | `GHWATCHER_CHECK_BRANCH`       | no              | restrict to one branch |
//! | `GHWATCHER_ENFORCE_PRIVATE`    | no              | `true` to process private repositories |
//! | `GHWATCHER_REPO_SKIP_LIST`     | **yes** (empty ok) | repositories to exclude |
//! | `GHWATCHER_ENABLE_DEPENDABOT`  | no              | `true` to enable missing Dependabot alerts |
//! | `GHWATCHER_NOTIFY_USER`        | no              | user mentioned in a notification issue |

use crate::{BranchName, ComplianceError, OrganizationName, RepositoryName, UserLogin};

pub const ALLOWED_ORG_LIST_VAR: &str = "GHWATCHER_ALLOWED_ORG_LIST";
pub const CHECK_ORG_VAR: &str = "GHWATCHER_CHECK_ORG";
pub const CHECK_REPO_VAR: &str = "GHWATCHER_CHECK_REPO";
pub const CHECK_BRANCH_VAR: &str = "GHWATCHER_CHECK_BRANCH";
pub const ENFORCE_PRIVATE_VAR: &str = "GHWATCHER_ENFORCE_PRIVATE";
pub const REPO_SKIP_LIST_VAR: &str = "GHWATCHER_REPO_SKIP_LIST";
pub const ENABLE_DEPENDABOT_VAR: &str = "GHWATCHER_ENABLE_DEPENDABOT";
pub const NOTIFY_USER_VAR: &str = "GHWATCHER_NOTIFY_USER";

/// A comma- and/or whitespace-separated list of names.
///
/// Membership is exact and case-sensitive against each listed token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList(Vec<String>);

impl NameList {
    /// Splits `raw` on commas and whitespace, dropping empty tokens.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Returns `true` if `name` is one of the listed tokens.
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|entry| entry == name)
    }

    /// Returns `true` if the list has no tokens.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Inputs of one compliance run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Organization to process. Always a member of the allowed list.
    pub organization: OrganizationName,
    /// Restrict the run to this repository (case-insensitive).
    pub repository_filter: Option<RepositoryName>,
    /// Inspect this branch instead of each repository's default branch.
    pub branch_filter: Option<BranchName>,
    /// Process private repositories too.
    pub enforce_private: bool,
    /// Repositories excluded from the run.
    pub skip_list: NameList,
    /// Enable Dependabot alerts where they are disabled.
    pub enable_dependabot: bool,
    /// Mention this user in a notification issue after corrective actions.
    pub notify_user: Option<UserLogin>,
}

impl RunConfig {
    /// Builds the run configuration from a variable lookup.
    ///
    /// Fails when the allowed-org list or the skip list is unset, or when the
    /// check organization is unset or not in the allowed list.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ComplianceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let allowed = lookup(ALLOWED_ORG_LIST_VAR).ok_or_else(|| {
            ComplianceError::configuration(format!(
                "Could not determine the allowed organization list. {ALLOWED_ORG_LIST_VAR} must be set."
            ))
        })?;
        let allowed = NameList::parse(&allowed);

        let organization = lookup(CHECK_ORG_VAR)
            .and_then(OrganizationName::new)
            .ok_or_else(|| {
                ComplianceError::configuration(format!(
                    "Could not determine the organization to check. {CHECK_ORG_VAR} must be set."
                ))
            })?;
        if !allowed.contains(organization.as_str()) {
            return Err(ComplianceError::configuration(format!(
                "Organization '{organization}' is not listed in {ALLOWED_ORG_LIST_VAR}."
            )));
        }

        let skip_list = lookup(REPO_SKIP_LIST_VAR)
            .map(|raw| NameList::parse(&raw))
            .ok_or_else(|| {
                ComplianceError::configuration(format!(
                    "{REPO_SKIP_LIST_VAR} must be set (it may be empty)."
                ))
            })?;

        Ok(Self {
            organization,
            repository_filter: lookup(CHECK_REPO_VAR).and_then(RepositoryName::new),
            branch_filter: lookup(CHECK_BRANCH_VAR).and_then(BranchName::new),
            enforce_private: flag(lookup(ENFORCE_PRIVATE_VAR)),
            skip_list,
            enable_dependabot: flag(lookup(ENABLE_DEPENDABOT_VAR)),
            notify_user: lookup(NOTIFY_USER_VAR).and_then(UserLogin::new),
        })
    }
}

fn flag(value: Option<String>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}
