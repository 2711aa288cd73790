//! Compliance domain for ghwatcher.
//!
//! This crate holds every domain concept of a compliance run: identifiers,
//! the aggregated status records, the baseline policy, and the three stages
//! that act on them. Infrastructure crates implement [`github::GitHubApi`];
//! they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed from GitHub; the `github` crate defines *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype names (`OrganizationName`, `BranchName`, etc.) and `RunId` |
//! | [`types`] | Aggregated status records (`RunReport`, `RepositoryStatus`, `Protection`) |
//! | [`errors`] | Run-aborting error type |
//! | [`github`] | The `GitHubApi` port and its records |
//! | [`policy`] | Baseline protection policy and empty-repository bootstrap |
//! | [`config`] | Run configuration parsed from environment-style inputs |
//! | [`aggregator`] | Status aggregation |
//! | [`reconciler`] | Policy reconciliation |
//! | [`report`] | Summary rows and markdown rendering |
//! | [`workflow`] | Aggregate → reconcile → aggregate → format |

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod github;
pub mod identifiers;
pub mod policy;
pub mod reconciler;
pub mod report;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::RunConfig;
pub use errors::ComplianceError;
pub use github::{GitHubApi, GitHubError};
pub use identifiers::{BranchName, OrganizationName, RepositoryName, RunId, UserLogin};
pub use policy::{BootstrapPolicy, ProtectionPolicy};
pub use types::{
    BranchListing, BranchProtectionState, BranchStatus, Protection, RepositoryStatus, RunReport,
    Setting, Timestamp,
};
