//! Report formatting: flatten a [`RunReport`] into one summary row per
//! repository and render the rows as a markdown table.

use serde::Serialize;

use crate::{OrganizationName, Protection, RunReport, Setting};

/// Glyph used for `true` cells.
pub const CHECKED: &str = ":white_check_mark:";

/// Placeholder for settings that do not apply or are unknown.
pub const ABSENT: &str = "-";

/// One table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// Free text (names).
    Text(String),
    /// A flag.
    Flag(bool),
    /// A count.
    Count(u32),
    /// No value.
    Absent,
}

impl Cell {
    fn from_flag(setting: Setting<bool>) -> Self {
        setting.value().map_or(Cell::Absent, Cell::Flag)
    }

    fn from_count(setting: Setting<u32>) -> Self {
        setting.value().map_or(Cell::Absent, Cell::Count)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Flag(true) => write!(f, "{CHECKED}"),
            Cell::Flag(false) => write!(f, "false"),
            Cell::Count(n) => write!(f, "{n}"),
            Cell::Absent => write!(f, "{ABSENT}"),
        }
    }
}

/// The flattened status of one repository's default branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    /// Repository name.
    pub repo_name: Cell,
    /// Whether Dependabot vulnerability alerts are on.
    pub dependabot_vulnerability_alerts_enabled: Cell,
    /// Name of the default branch.
    pub default_branch: Cell,
    /// Whether the default branch is protected.
    pub branch_protected: Cell,
    /// Required approving review count.
    pub required_pull_request_reviews: Cell,
    /// Whether code owner review is required.
    pub require_code_owner_reviews: Cell,
    /// Whether signed commits are required.
    pub required_signatures: Cell,
    /// Whether the rules apply to administrators.
    pub enforce_admins: Cell,
    /// Whether merge commits are forbidden.
    pub required_linear_history: Cell,
    /// Whether force pushes are allowed.
    pub allow_force_pushes: Cell,
    /// Whether the branch may be deleted.
    pub allow_deletions: Cell,
    /// Whether matching branch creation is blocked.
    pub block_creations: Cell,
    /// Whether review conversations must be resolved before merging.
    pub required_conversation_resolution: Cell,
}

impl SummaryRow {
    /// Column names, in table order.
    pub const COLUMNS: [&'static str; 13] = [
        "repo_name",
        "dependabot_vulnerability_alerts_enabled",
        "default_branch",
        "branch_protected",
        "required_pull_request_reviews",
        "require_code_owner_reviews",
        "required_signatures",
        "enforce_admins",
        "required_linear_history",
        "allow_force_pushes",
        "allow_deletions",
        "block_creations",
        "required_conversation_resolution",
    ];

    /// Cells in [`SummaryRow::COLUMNS`] order.
    pub fn cells(&self) -> [&Cell; 13] {
        [
            &self.repo_name,
            &self.dependabot_vulnerability_alerts_enabled,
            &self.default_branch,
            &self.branch_protected,
            &self.required_pull_request_reviews,
            &self.require_code_owner_reviews,
            &self.required_signatures,
            &self.enforce_admins,
            &self.required_linear_history,
            &self.allow_force_pushes,
            &self.allow_deletions,
            &self.block_creations,
            &self.required_conversation_resolution,
        ]
    }
}

/// Projects every repository whose default branch was selected into a row.
///
/// Repositories whose default branch is not among the selected branches
/// (a branch filter pointing elsewhere, a failed branch listing) produce no
/// row.
pub fn summarize(report: &RunReport) -> Vec<SummaryRow> {
    report
        .repositories
        .iter()
        .filter_map(|repo| {
            let branch = repo.default_branch_status()?;
            let protection = branch.protection();
            let flag = |pick: fn(&Protection) -> Setting<bool>| {
                protection.map_or(Cell::Absent, |p| Cell::from_flag(pick(p)))
            };

            Some(SummaryRow {
                repo_name: Cell::Text(repo.name.to_string()),
                dependabot_vulnerability_alerts_enabled: Cell::Flag(
                    repo.dependabot_vulnerability_alerts_enabled,
                ),
                default_branch: Cell::Text(branch.name.to_string()),
                branch_protected: Cell::Flag(branch.is_protected()),
                required_pull_request_reviews: protection.map_or(Cell::Absent, |p| {
                    Cell::from_count(p.required_approving_review_count)
                }),
                require_code_owner_reviews: flag(|p| p.require_code_owner_reviews),
                required_signatures: flag(|p| p.required_signatures),
                enforce_admins: flag(|p| p.enforce_admins),
                required_linear_history: flag(|p| p.required_linear_history),
                allow_force_pushes: flag(|p| p.allow_force_pushes),
                allow_deletions: flag(|p| p.allow_deletions),
                block_creations: flag(|p| p.block_creations),
                required_conversation_resolution: flag(|p| p.required_conversation_resolution),
            })
        })
        .collect()
}

/// Renders the rows as a titled markdown table with centred columns.
///
/// With no rows the output is the title, header, and divider only.
pub fn render_markdown(organization: &OrganizationName, rows: &[SummaryRow]) -> String {
    let mut out = format!("# {organization} Details:\n");

    for column in SummaryRow::COLUMNS {
        out.push_str(&format!("| {} ", column.replace('_', " ")));
    }
    out.push_str("|\n");

    out.push_str(&"| :-: ".repeat(SummaryRow::COLUMNS.len()));
    out.push_str("|\n");

    for row in rows {
        for cell in row.cells() {
            out.push_str(&format!("| {cell} "));
        }
        out.push_str("|\n");
    }
    out
}
