//! Policy reconciliation: bring each repository's default branch in line with
//! the baseline policy.
//!
//! The reconciler reads a [`RunReport`] and issues corrective calls; it never
//! edits the report. Every repository is handled in isolation: a failed call
//! is logged with its org/repo/branch context, recorded in the
//! [`ReconciliationSummary`], and processing moves on. Nothing is retried.

use tracing::{debug, error, info, warn};

use crate::github::{GitHubApi, GitHubError};
use crate::policy::{BootstrapPolicy, ProtectionPolicy};
use crate::{
    BranchListing, BranchName, BranchProtectionState, BranchStatus, RepositoryName,
    RepositoryStatus, RunReport, UserLogin,
};

/// Title of the issue opened when a user asked to be notified.
pub const NOTIFICATION_ISSUE_TITLE: &str = "watcher-bot action taken";

/// Why protection is being (re)applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionReason {
    /// The default branch had no protection.
    Unprotected,
    /// The default branch was protected but diverged from the policy.
    OutOfSync,
}

/// A corrective call issued by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Committed a README to create the default branch of an empty repository.
    CreateDefaultBranch {
        /// Branch that was created.
        branch: BranchName,
    },
    /// Wrote the full policy to the default branch.
    ApplyProtection {
        /// Branch the policy was written to.
        branch: BranchName,
        /// Why it was written.
        reason: ProtectionReason,
    },
    /// Enabled Dependabot vulnerability alerts.
    EnableVulnerabilityAlerts,
    /// Opened a notification issue mentioning a user.
    NotifyUser {
        /// User mentioned in the issue.
        user: UserLogin,
    },
}

/// One attempted action and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    /// Repository the action targeted.
    pub repo: RepositoryName,
    /// What was attempted.
    pub action: ReconcileAction,
    /// The call's result.
    pub outcome: Result<(), GitHubError>,
}

/// Everything the reconciler attempted during one pass, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationSummary {
    /// Attempted actions.
    pub records: Vec<ActionRecord>,
}

impl ReconciliationSummary {
    /// Number of protection writes attempted.
    pub fn protection_updates(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.action, ReconcileAction::ApplyProtection { .. }))
            .count()
    }

    /// Records whose call failed.
    pub fn failures(&self) -> impl Iterator<Item = &ActionRecord> {
        self.records.iter().filter(|r| r.outcome.is_err())
    }

    /// Returns `true` if nothing was attempted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Applies the baseline policy through a [`GitHubApi`].
pub struct Reconciler<'a> {
    client: &'a dyn GitHubApi,
    policy: ProtectionPolicy,
    bootstrap: BootstrapPolicy,
    enable_dependabot: bool,
    notify_user: Option<UserLogin>,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler enforcing `policy`, with the default bootstrap
    /// content, Dependabot enforcement off, and no notification.
    pub fn new(client: &'a dyn GitHubApi, policy: ProtectionPolicy) -> Self {
        Self {
            client,
            policy,
            bootstrap: BootstrapPolicy::default(),
            enable_dependabot: false,
            notify_user: None,
        }
    }

    /// Replaces the bootstrap content for empty repositories.
    pub fn with_bootstrap(mut self, bootstrap: BootstrapPolicy) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Enables Dependabot alerts where they are disabled.
    pub fn with_dependabot_enforcement(mut self, enabled: bool) -> Self {
        self.enable_dependabot = enabled;
        self
    }

    /// Opens a notification issue mentioning `user` on every repository where
    /// a corrective action succeeded.
    pub fn with_notification(mut self, user: Option<UserLogin>) -> Self {
        self.notify_user = user;
        self
    }

    /// Reconciles every repository in the report, in report order.
    pub async fn reconcile(&self, report: &RunReport) -> ReconciliationSummary {
        let mut summary = ReconciliationSummary::default();
        for repo in &report.repositories {
            self.reconcile_repository(repo, &mut summary).await;
        }

        let failed = summary.failures().count();
        if failed > 0 {
            warn!(org = %report.organization, failed, "Some corrective actions failed");
        }
        info!(
            org = %report.organization,
            actions = summary.records.len(),
            "Reconciliation finished"
        );
        summary
    }

    async fn reconcile_repository(&self, repo: &RepositoryStatus, summary: &mut ReconciliationSummary) {
        if repo.branch_listing == BranchListing::Unavailable {
            warn!(org = %repo.owner, repo = %repo.name, "Branch listing unavailable; skipping");
            return;
        }

        let first = summary.records.len();

        let default_branch = if repo.is_empty() {
            self.bootstrap_default_branch(repo, summary).await
        } else {
            repo.default_branch_status().cloned()
        };

        match default_branch {
            Some(branch) => self.enforce_protection(repo, &branch, summary).await,
            None => debug!(
                org = %repo.owner,
                repo = %repo.name,
                "Default branch not among selected branches; protection left unchanged"
            ),
        }

        if self.enable_dependabot && !repo.dependabot_vulnerability_alerts_enabled {
            info!(org = %repo.owner, repo = %repo.name, "Enabling Dependabot alert scanning");
            let outcome = self
                .client
                .enable_vulnerability_alerts(&repo.owner, &repo.name)
                .await;
            if let Err(err) = &outcome {
                error!(org = %repo.owner, repo = %repo.name, error = %err, "Failed to enable Dependabot alerts");
            }
            summary.records.push(ActionRecord {
                repo: repo.name.clone(),
                action: ReconcileAction::EnableVulnerabilityAlerts,
                outcome,
            });
        }

        let acted = summary.records[first..].iter().any(|r| r.outcome.is_ok());
        if let (true, Some(user)) = (acted, &self.notify_user) {
            self.notify(repo, user, summary).await;
        }
    }

    async fn bootstrap_default_branch(
        &self,
        repo: &RepositoryStatus,
        summary: &mut ReconciliationSummary,
    ) -> Option<BranchStatus> {
        let branch = self.bootstrap.branch.clone();
        info!(org = %repo.owner, repo = %repo.name, branch = %branch, "Creating default branch with README");

        let outcome = self
            .client
            .create_file(
                &repo.owner,
                &repo.name,
                &branch,
                &self.bootstrap.path,
                &self.bootstrap.commit_message,
                &self.bootstrap.readme(&repo.name),
            )
            .await;
        let created = outcome.is_ok();
        if let Err(err) = &outcome {
            error!(org = %repo.owner, repo = %repo.name, branch = %branch, error = %err, "Failed to create default branch");
        }
        summary.records.push(ActionRecord {
            repo: repo.name.clone(),
            action: ReconcileAction::CreateDefaultBranch {
                branch: branch.clone(),
            },
            outcome,
        });

        created.then(|| BranchStatus::unprotected(branch))
    }

    async fn enforce_protection(
        &self,
        repo: &RepositoryStatus,
        branch: &BranchStatus,
        summary: &mut ReconciliationSummary,
    ) {
        let reason = match &branch.protection {
            BranchProtectionState::Unprotected => ProtectionReason::Unprotected,
            BranchProtectionState::Protected(p) if !self.policy.is_satisfied_by(p) => {
                ProtectionReason::OutOfSync
            }
            BranchProtectionState::Protected(_) => {
                debug!(org = %repo.owner, repo = %repo.name, branch = %branch.name, "Branch protection compliant");
                return;
            }
        };

        match reason {
            ProtectionReason::Unprotected => {
                info!(org = %repo.owner, repo = %repo.name, branch = %branch.name, "Applying branch protection rules")
            }
            ProtectionReason::OutOfSync => {
                info!(org = %repo.owner, repo = %repo.name, branch = %branch.name, "Processing sync updates")
            }
        }

        let outcome = self
            .client
            .update_branch_protection(&repo.owner, &repo.name, &branch.name, &self.policy)
            .await;
        if let Err(err) = &outcome {
            error!(
                org = %repo.owner,
                repo = %repo.name,
                branch = %branch.name,
                status = err.status(),
                error = %err,
                "Failed to update branch protection"
            );
        }
        summary.records.push(ActionRecord {
            repo: repo.name.clone(),
            action: ReconcileAction::ApplyProtection {
                branch: branch.name.clone(),
                reason,
            },
            outcome,
        });
    }

    async fn notify(&self, repo: &RepositoryStatus, user: &UserLogin, summary: &mut ReconciliationSummary) {
        info!(org = %repo.owner, repo = %repo.name, user = %user, "Creating notification issue");
        let body = format!(
            "Hello @{user}!  This is a notification issue that the watcher-bot \
             performed actions on this repository to apply baseline configurations \
             and branch protections for the default branch."
        );
        let outcome = self
            .client
            .create_issue(&repo.owner, &repo.name, NOTIFICATION_ISSUE_TITLE, &body)
            .await;
        if let Err(err) = &outcome {
            error!(org = %repo.owner, repo = %repo.name, error = %err, "Failed to create notification issue");
        }
        summary.records.push(ActionRecord {
            repo: repo.name.clone(),
            action: ReconcileAction::NotifyUser { user: user.clone() },
            outcome,
        });
    }
}
