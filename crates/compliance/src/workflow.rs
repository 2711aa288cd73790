//! Entry workflow: aggregate, reconcile, aggregate again, format.
//!
//! The second aggregation is what the report shows, so the table reflects the
//! state after corrective actions rather than before them.

use tracing::{info, warn, Instrument};

use crate::aggregator::{AggregationScope, StatusAggregator};
use crate::github::GitHubApi;
use crate::policy::ProtectionPolicy;
use crate::reconciler::{ReconciliationSummary, Reconciler};
use crate::report::{render_markdown, summarize, SummaryRow};
use crate::{ComplianceError, RunConfig, RunId, RunReport};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// What the reconciler attempted.
    pub reconciliation: ReconciliationSummary,
    /// State after reconciliation.
    pub final_report: RunReport,
    /// Flattened rows of `final_report`.
    pub rows: Vec<SummaryRow>,
    /// Markdown rendering of `rows`.
    pub markdown: String,
}

/// Runs one complete compliance pass against `client`.
///
/// Only configuration problems and a failed organization listing return an
/// error; every per-repository failure is logged and absorbed.
pub async fn run(
    client: &dyn GitHubApi,
    config: &RunConfig,
    policy: ProtectionPolicy,
    run_id: RunId,
) -> Result<RunOutcome, ComplianceError> {
    let span = tracing::info_span!("compliance_run", run_id = %run_id, org = %config.organization);
    run_inner(client, config, policy, run_id).instrument(span).await
}

async fn run_inner(
    client: &dyn GitHubApi,
    config: &RunConfig,
    policy: ProtectionPolicy,
    run_id: RunId,
) -> Result<RunOutcome, ComplianceError> {
    let aggregator = StatusAggregator::new(client, AggregationScope::from_config(config));

    let initial = aggregator.collect(run_id).await?;
    info!(repositories = initial.repositories.len(), "Collected initial status");

    let reconciliation = Reconciler::new(client, policy)
        .with_dependabot_enforcement(config.enable_dependabot)
        .with_notification(config.notify_user.clone())
        .reconcile(&initial)
        .await;

    let final_report = aggregator.collect(run_id).await?;
    match serde_json::to_string_pretty(&final_report) {
        Ok(json) => info!("Final status:\n{json}"),
        Err(err) => warn!(error = %err, "Failed to serialize final status"),
    }

    let rows = summarize(&final_report);
    let markdown = render_markdown(&final_report.organization, &rows);

    Ok(RunOutcome {
        reconciliation,
        final_report,
        rows,
        markdown,
    })
}
