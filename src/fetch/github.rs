//! GitHub API interaction
//!
//! Repository metadata (default branch) and latest-release discovery.
//! Branch lookups are best-effort; release lookups are not.

use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;

use super::locator::{BranchInfo, RepositoryRef};
use crate::config::GitHubConfig;
use crate::error::{FetchError, StepResult};

/// Subset of `GET /repos/{owner}/{name}`
#[derive(Deserialize, Debug)]
pub struct GitHubRepo {
    #[serde(default)]
    pub default_branch: Option<String>,
}

/// Subset of `GET /repos/{owner}/{name}/releases/latest`
#[derive(Deserialize, Debug)]
pub struct GitHubRelease {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
    #[serde(default)]
    pub zipball_url: Option<String>,
}

/// GitHub release asset metadata
#[derive(Deserialize, Debug)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// Where the archive of a release comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub tag_name: Option<String>,
    /// First attached asset whose name ends in `.zip`
    pub zip_asset_url: Option<String>,
    /// Auto-generated source archive of the release
    pub source_zip_url: Option<String>,
}

impl ReleaseInfo {
    /// Select the archive to download: the uploaded `.zip` asset, else the source archive
    pub fn from_release(repo: &RepositoryRef, release: GitHubRelease) -> StepResult<Self> {
        let zip_asset_url = release
            .assets
            .into_iter()
            .find(|a| {
                a.name.to_ascii_lowercase().ends_with(".zip")
                    && !a.browser_download_url.trim().is_empty()
            })
            .map(|a| a.browser_download_url);
        let source_zip_url = release.zipball_url.filter(|u| !u.trim().is_empty());

        if zip_asset_url.is_none() && source_zip_url.is_none() {
            return Err(FetchError::NoReleaseArchive {
                repo: repo.to_string(),
            });
        }

        Ok(Self {
            tag_name: release.tag_name,
            zip_asset_url,
            source_zip_url,
        })
    }

    pub fn archive_url(&self) -> Option<&str> {
        self.zip_asset_url
            .as_deref()
            .or(self.source_zip_url.as_deref())
    }
}

/// Why an API call produced no usable body
#[derive(Debug)]
enum ApiFailure {
    Transport(String),
    Status(StatusCode),
    Decode(String),
}

impl ApiFailure {
    fn unavailable(self, repo: &RepositoryRef) -> FetchError {
        let message = match self {
            ApiFailure::Transport(e) => format!("request failed: {e}"),
            ApiFailure::Status(status) => format!("HTTP {status}"),
            ApiFailure::Decode(e) => format!("Failed to parse GitHub API response: {e}"),
        };
        FetchError::ApiUnavailable {
            repo: repo.to_string(),
            message,
        }
    }
}

/// GitHub API client
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: String,
    web_url: String,
    request_timeout: Duration,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> StepResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );

        // No overall timeout on the client: archive downloads are bounded by
        // the inactivity timeout instead.
        let http = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| FetchError::ApiUnavailable {
                repo: config.api_url.clone(),
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            web_url: config.web_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Shared HTTP client, also used for archive downloads
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// `https://<host>/{owner}/{name}/archive/refs/heads/{branch}.zip`
    pub fn branch_archive_url(&self, repo: &RepositoryRef, branch: &BranchInfo) -> String {
        format!(
            "{}/{}/{}/archive/refs/heads/{}.zip",
            self.web_url, repo.owner, repo.name, branch.branch_name
        )
    }

    /// Repository metadata
    pub async fn get_repo(&self, repo: &RepositoryRef) -> StepResult<GitHubRepo> {
        let url = format!("{}/repos/{}/{}", self.api_url, repo.owner, repo.name);
        self.api_get(&url).await.map_err(|e| e.unavailable(repo))
    }

    /// Latest published release; a non-success status means there is none
    pub async fn get_latest_release(&self, repo: &RepositoryRef) -> StepResult<GitHubRelease> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url, repo.owner, repo.name
        );
        self.api_get(&url).await.map_err(|e| match e {
            ApiFailure::Status(status) => FetchError::NoRelease {
                repo: repo.to_string(),
                status: status.as_u16(),
            },
            other => other.unavailable(repo),
        })
    }

    /// Default branch, or `main` on any failure. Never errors.
    pub async fn resolve_default_branch(&self, repo: &RepositoryRef) -> BranchInfo {
        match self.get_repo(repo).await {
            Ok(info) => {
                let branch = BranchInfo::new(info.default_branch.as_deref());
                debug!("Default branch of {} is {}", repo, branch.branch_name);
                branch
            }
            Err(e) => {
                let fallback = BranchInfo::fallback();
                warn!(
                    "Could not resolve default branch ({}), using '{}'",
                    e, fallback.branch_name
                );
                fallback
            }
        }
    }

    /// Latest release with a downloadable archive
    pub async fn resolve_latest_release(&self, repo: &RepositoryRef) -> StepResult<ReleaseInfo> {
        let release = self.get_latest_release(repo).await?;
        let info = ReleaseInfo::from_release(repo, release)?;
        debug!(
            "Latest release of {} ({}) archive: {:?}",
            repo,
            info.tag_name.as_deref().unwrap_or("untagged"),
            info.archive_url()
        );
        Ok(info)
    }

    async fn api_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ApiFailure> {
        let response = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiFailure::Status(status));
        }

        response
            .json()
            .await
            .map_err(|e| ApiFailure::Decode(e.to_string()))
    }
}
