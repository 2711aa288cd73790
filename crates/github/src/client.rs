//! REST implementation of [`GitHubApi`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use compliance::github::{BranchSummary, CodeScanningAnalysis, RepositorySummary};
use compliance::{
    BranchName, GitHubApi, GitHubError, OrganizationName, Protection, ProtectionPolicy,
    RepositoryName,
};

use crate::auth;
use crate::models::{
    AnalysisResponse, BranchResponse, CreateFileRequest, CreateIssueRequest, ErrorBody,
    InstallationTokenResponse, ProtectionResponse, RepoResponse, UpdateProtectionRequest,
};
use crate::settings::GithubSettings;

/// Items requested per page on listing endpoints (GitHub's maximum).
const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = concat!("ghwatcher/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const ACCEPT: &str = "application/vnd.github+json";

fn transport(err: reqwest::Error) -> GitHubError {
    if err.is_decode() {
        GitHubError::Decode {
            message: err.to_string(),
        }
    } else {
        GitHubError::Request {
            message: err.to_string(),
        }
    }
}

/// Extracts the `message` of an error body, falling back to the raw body.
///
/// A body that could not be read is reported as such rather than as an empty
/// message.
fn error_message<E: std::fmt::Display>(body: Result<String, E>) -> String {
    match body {
        Ok(body) => serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or(body),
        Err(err) => {
            debug!(error = %err, "Failed to read error response body");
            format!("<unreadable response body: {err}>")
        }
    }
}

/// Authenticated GitHub REST client.
pub struct GithubClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl GithubClient {
    /// Creates a client that sends `token` as its bearer credential.
    pub fn with_token(
        base_url: &str,
        token: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, GitHubError> {
        let base_url = Url::parse(base_url).map_err(|e| GitHubError::Request {
            message: format!("invalid base URL '{base_url}': {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GitHubError::Request {
                message: format!("base URL '{base_url}' cannot carry a path"),
            });
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(transport)?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// Authenticates as a GitHub App installation and returns a client using
    /// the resulting installation access token.
    pub async fn from_app(settings: &GithubSettings) -> Result<Self, GitHubError> {
        let creds = &settings.credentials;
        let jwt = auth::app_jwt(&creds.app_id, &creds.private_key_pem)?;

        let app_client = Self::with_token(&settings.base_url, jwt, settings.request_timeout)?;
        let installation = creds.installation_id.to_string();
        let response = app_client
            .request(
                Method::POST,
                &["app", "installations", installation.as_str(), "access_tokens"],
            )
            .send()
            .await
            .map_err(transport)?;
        let token: InstallationTokenResponse =
            Self::parse(response).await.map_err(|e| GitHubError::Authentication {
                message: format!("installation token exchange failed: {e}"),
            })?;

        debug!(installation_id = creds.installation_id, "Obtained installation access token");
        Self::with_token(&settings.base_url, token.token, settings.request_timeout)
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.http
            .request(method, self.url(segments))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Turns a non-success response into [`GitHubError::Api`].
    async fn check(response: Response) -> Result<Response, GitHubError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        Err(GitHubError::Api {
            status: status.as_u16(),
            message: error_message(response.text().await),
        })
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, GitHubError> {
        Self::check(response).await?.json::<T>().await.map_err(transport)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(), GitHubError> {
        let response = builder.send().await.map_err(transport)?;
        Self::check(response).await.map(|_| ())
    }

    /// Follows `page=N` until a page comes back short.
    async fn get_all<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Vec<T>, GitHubError> {
        let mut items = Vec::new();
        for page in 1.. {
            let response = self
                .request(Method::GET, segments)
                .query(&[("per_page", PAGE_SIZE), ("page", page)])
                .send()
                .await
                .map_err(transport)?;
            let batch: Vec<T> = Self::parse(response).await?;
            let done = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }
}

#[async_trait]
impl GitHubApi for GithubClient {
    async fn list_org_repositories(
        &self,
        org: &OrganizationName,
    ) -> Result<Vec<RepositorySummary>, GitHubError> {
        let repos: Vec<RepoResponse> = self.get_all(&["orgs", org.as_str(), "repos"]).await?;
        Ok(repos.into_iter().filter_map(RepoResponse::into_summary).collect())
    }

    async fn list_branches(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<Vec<BranchSummary>, GitHubError> {
        let branches: Vec<BranchResponse> = self
            .get_all(&["repos", owner.as_str(), repo.as_str(), "branches"])
            .await?;
        Ok(branches
            .into_iter()
            .filter_map(BranchResponse::into_summary)
            .collect())
    }

    async fn get_branch_protection(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
    ) -> Result<Protection, GitHubError> {
        let response = self
            .request(
                Method::GET,
                &["repos", owner.as_str(), repo.as_str(), "branches", branch.as_str(), "protection"],
            )
            .send()
            .await
            .map_err(transport)?;
        let protection: ProtectionResponse = Self::parse(response).await?;
        Ok(protection.into())
    }

    async fn update_branch_protection(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
        policy: &ProtectionPolicy,
    ) -> Result<(), GitHubError> {
        let body = UpdateProtectionRequest::from(policy);
        self.send(
            self.request(
                Method::PUT,
                &["repos", owner.as_str(), repo.as_str(), "branches", branch.as_str(), "protection"],
            )
            .json(&body),
        )
        .await
    }

    async fn vulnerability_alerts_status(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<u16, GitHubError> {
        let response = self
            .request(
                Method::GET,
                &["repos", owner.as_str(), repo.as_str(), "vulnerability-alerts"],
            )
            .send()
            .await
            .map_err(transport)?;
        Ok(response.status().as_u16())
    }

    async fn enable_vulnerability_alerts(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<(), GitHubError> {
        self.send(self.request(
            Method::PUT,
            &["repos", owner.as_str(), repo.as_str(), "vulnerability-alerts"],
        ))
        .await
    }

    async fn list_code_scanning_analyses(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
    ) -> Result<Vec<CodeScanningAnalysis>, GitHubError> {
        // Only presence matters, so the first page is enough.
        let response = self
            .request(
                Method::GET,
                &["repos", owner.as_str(), repo.as_str(), "code-scanning", "analyses"],
            )
            .send()
            .await
            .map_err(transport)?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        let analyses: Vec<AnalysisResponse> = Self::parse(response).await?;
        Ok(analyses.into_iter().map(Into::into).collect())
    }

    async fn create_file(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
        branch: &BranchName,
        path: &str,
        message: &str,
        content: &str,
    ) -> Result<(), GitHubError> {
        let mut segments = vec!["repos", owner.as_str(), repo.as_str(), "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let body = CreateFileRequest {
            message,
            content: STANDARD.encode(content),
            branch: branch.as_str(),
        };
        self.send(self.request(Method::PUT, &segments).json(&body))
            .await
    }

    async fn create_issue(
        &self,
        owner: &OrganizationName,
        repo: &RepositoryName,
        title: &str,
        body: &str,
    ) -> Result<(), GitHubError> {
        self.send(
            self.request(Method::POST, &["repos", owner.as_str(), repo.as_str(), "issues"])
                .json(&CreateIssueRequest { title, body }),
        )
        .await
    }
}
