//! Adapter settings parsed from environment-style inputs.
//!
//! | Env Var                          | Required | Default                  |
//! |----------------------------------|----------|--------------------------|
//! | `GHWATCHER_BASEURL`              | no       | `https://api.github.com` |
//! | `GHWATCHER_APP_ID`               | **yes**  | --                       |
//! | `GHWATCHER_APP_PEM`              | **yes**  | --                       |
//! | `GHWATCHER_APP_INSTALLATION_ID`  | **yes**  | --                       |
//! | `GHWATCHER_REQUEST_TIMEOUT_SECS` | no       | `30`                     |

use std::time::Duration;

use compliance::ComplianceError;

pub const BASE_URL_VAR: &str = "GHWATCHER_BASEURL";
pub const APP_ID_VAR: &str = "GHWATCHER_APP_ID";
pub const APP_PEM_VAR: &str = "GHWATCHER_APP_PEM";
pub const APP_INSTALLATION_ID_VAR: &str = "GHWATCHER_APP_INSTALLATION_ID";
pub const REQUEST_TIMEOUT_VAR: &str = "GHWATCHER_REQUEST_TIMEOUT_SECS";

/// Public GitHub REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";
/// Default per-request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// GitHub App credentials.
#[derive(Clone)]
pub struct AppCredentials {
    /// The app id.
    pub app_id: String,
    /// PEM-encoded RSA private key.
    pub private_key_pem: String,
    /// Installation to act as.
    pub installation_id: u64,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("private_key_pem", &"<redacted>")
            .field("installation_id", &self.installation_id)
            .finish()
    }
}

/// Everything needed to construct a [`crate::GithubClient`].
#[derive(Debug, Clone)]
pub struct GithubSettings {
    /// API base URL without a trailing slash.
    pub base_url: String,
    /// App credentials.
    pub credentials: AppCredentials,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl GithubSettings {
    /// Builds the settings from a variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ComplianceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ComplianceError::configuration(format!("{key} must be set")))
        };

        let app_id = required(APP_ID_VAR)?.trim().to_string();
        let private_key_pem = crate::auth::normalize_pem(&required(APP_PEM_VAR)?);
        let installation_id = required(APP_INSTALLATION_ID_VAR)?
            .trim()
            .parse::<u64>()
            .map_err(|_| {
                ComplianceError::configuration(format!(
                    "{APP_INSTALLATION_ID_VAR} must be a positive integer"
                ))
            })?;

        let base_url = lookup(BASE_URL_VAR)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let request_timeout = match lookup(REQUEST_TIMEOUT_VAR) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ComplianceError::configuration(format!("{REQUEST_TIMEOUT_VAR} must be a valid u64"))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            credentials: AppCredentials {
                app_id,
                private_key_pem,
                installation_id,
            },
            request_timeout: Duration::from_secs(request_timeout),
        })
    }
}
