use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Source of raw release records.
///
/// The version catalog depends only on this trait; [`GitHub`] is the
/// production implementation, mocks stand in for it in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Fetch all raw releases for the configured repository.
    async fn fetch_releases(&self) -> Result<Vec<RawRelease>>;
}

/// GitHub release API client bound to a single repository.
pub struct GitHub {
    pub client: Client,
    pub api_url: String,
    pub repo: GitHubRepo,
}

impl GitHub {
    #[tracing::instrument(skip(client, api_url))]
    pub fn new(client: Client, repo: GitHubRepo, api_url: Option<String>) -> Self {
        let api_url = api_url.unwrap_or_else(|| "https://api.github.com".to_string());
        Self {
            client,
            api_url,
            repo,
        }
    }

    #[tracing::instrument(skip(client, api_url))]
    pub async fn get_releases(
        repo: &GitHubRepo,
        client: &Client,
        api_url: &str,
    ) -> Result<Vec<RawRelease>> {
        let mut releases = Vec::new();
        let mut page = 1;

        // Limit to 10 pages (1000 releases) to prevent an infinite loop
        while page <= 10 {
            let url = format!("{}/repos/{}/{}/releases", api_url, repo.owner, repo.repo);

            let request = client
                .get(&url)
                .query(&[("per_page", "100"), ("page", &page.to_string())]);

            debug!("Fetching releases page {} from {}...", page, url);

            let response = request
                .send()
                .await
                .context("Failed to send request to GitHub API")?;

            let parsed: Vec<RawRelease> = response
                .error_for_status()?
                .json()
                .await
                .context("Failed to parse JSON response from GitHub API")?;

            if parsed.is_empty() {
                break;
            }

            let len = parsed.len();
            releases.extend(parsed);

            if len < 100 {
                break;
            }

            page += 1;
        }

        Ok(releases)
    }
}

#[async_trait]
impl ReleaseSource for GitHub {
    #[tracing::instrument(skip(self))]
    async fn fetch_releases(&self) -> Result<Vec<RawRelease>> {
        GitHub::get_releases(&self.repo, &self.client, &self.api_url).await
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct GitHubRepo {
    pub owner: String,
    pub repo: String,
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for GitHubRepo {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            Err(anyhow!("Invalid repository format. Expected 'owner/repo'."))
        } else {
            Ok(GitHubRepo {
                owner: parts[0].to_string(),
                repo: parts[1].to_string(),
            })
        }
    }
}

/// Raw release asset as returned by the GitHub API
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, Default)]
pub struct RawAsset {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub download_count: u64,
}

/// Raw GitHub release, before normalization
#[derive(Deserialize, Serialize, Debug, PartialEq, Clone, Default)]
pub struct RawRelease {
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
    pub body: Option<String>,
    // Null for drafts, which never survive normalization anyway
    pub published_at: Option<String>,
    pub assets: Vec<RawAsset>,
}
