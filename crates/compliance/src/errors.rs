//! Top-level error type for a compliance run.
//!
//! [`ComplianceError`] covers conditions that abort the whole run. Failures of
//! individual GitHub calls are reported as [`crate::github::GitHubError`] and
//! are, with the single exception of the organization listing, absorbed per
//! repository by the aggregator and reconciler.

use thiserror::Error;

use crate::github::GitHubError;
use crate::OrganizationName;

/// Errors that abort a compliance run.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// The process configuration is missing or invalid.
    ///
    /// Produced before any remote call is made.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// The organization's repositories could not be listed.
    ///
    /// Without the listing there is nothing to aggregate, so the run stops.
    #[error("Failed to list repositories for '{organization}': {source}")]
    RepositoryListing {
        /// Organization whose listing failed.
        organization: OrganizationName,
        /// Underlying GitHub failure.
        #[source]
        source: GitHubError,
    },

    /// The report could not be written to its output sink.
    #[error("Failed to write report to '{destination}': {message}")]
    Output {
        /// Human-readable destination (usually a file path).
        destination: String,
        /// Description of the write failure.
        message: String,
    },
}

impl ComplianceError {
    /// Shorthand for a [`ComplianceError::ConfigurationError`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}
