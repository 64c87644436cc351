use std::sync::Mutex;

use reqwest::header::{ACCEPT, HeaderMap, LINK};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::settings::ExporterSettings;

/// Upper bound on pages followed for a single paginated listing.
const MAX_PAGES: usize = 50;

const PER_PAGE: &str = "100";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("GitHub API returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
}

/// Partial GitHub API repository object.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    /// API URL of the repository itself.
    pub url: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub license: Option<License>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    /// Size in kilobytes.
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct License {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub created_at: String,
    pub download_count: u64,
}

/// Core API rate limit as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp at which the window resets.
    pub reset: u64,
}

impl RateLimit {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
        };
        Some(Self {
            limit: get("x-ratelimit-limit")?,
            remaining: get("x-ratelimit-remaining")?,
            reset: get("x-ratelimit-reset")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateLimit,
}

/// Authenticated client for the GitHub REST API.
pub struct GitHubClient {
    http: reqwest::Client,
    token: Option<String>,
    rate_url: String,
    last_rate: Mutex<Option<RateLimit>>,
}

impl GitHubClient {
    pub fn new(settings: &ExporterSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(
                "watchpost-github-exporter/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self {
            http,
            token: settings.token.clone(),
            rate_url: settings.rate_limit_url(),
            last_rate: Mutex::new(None),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn get(&self, url: &str, first_page: bool) -> Result<reqwest::Response, ClientError> {
        let mut req = self
            .http
            .get(url)
            .header(ACCEPT, "application/vnd.github+json");
        if first_page {
            req = req.query(&[("per_page", PER_PAGE)]);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|source| ClientError::Http {
            url: url.to_string(),
            source,
        })?;

        if let Some(rate) = RateLimit::from_headers(resp.headers())
            && let Ok(mut last) = self.last_rate.lock()
        {
            *last = Some(rate);
        }

        if !resp.status().is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        let resp = self.get(url, false).await?;
        resp.json().await.map_err(|source| ClientError::Http {
            url: url.to_string(),
            source,
        })
    }

    /// Fetch every page of a list endpoint, following `Link: rel="next"`.
    async fn get_paginated<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, ClientError> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut pages = 0;
        while let Some(page_url) = next.take() {
            let resp = self.get(&page_url, pages == 0).await?;
            next = resp
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link);
            let page: Vec<T> = resp.json().await.map_err(|source| ClientError::Http {
                url: page_url.clone(),
                source,
            })?;
            items.extend(page);

            pages += 1;
            if pages >= MAX_PAGES {
                if next.is_some() {
                    tracing::warn!(url, pages, "Stopped following pagination");
                }
                break;
            }
        }
        Ok(items)
    }

    pub async fn repository(&self, url: &str) -> Result<Repository, ClientError> {
        self.get_json(url).await
    }

    /// All repositories listed by an organization or user endpoint.
    pub async fn repository_list(&self, url: &str) -> Result<Vec<Repository>, ClientError> {
        self.get_paginated(url).await
    }

    /// Number of open pull requests on the repository at `repo_url`.
    pub async fn pull_request_count(&self, repo_url: &str) -> Result<usize, ClientError> {
        #[derive(Deserialize)]
        struct PullRequest {}

        let pulls: Vec<PullRequest> = self.get_paginated(&format!("{repo_url}/pulls")).await?;
        Ok(pulls.len())
    }

    /// First page of releases for the repository at `repo_url`.
    pub async fn releases(&self, repo_url: &str) -> Result<Vec<Release>, ClientError> {
        let url = format!("{repo_url}/releases");
        let resp = self.get(&url, true).await?;
        resp.json().await.map_err(|source| ClientError::Http { url, source })
    }

    /// Forget the rate limit seen so far, so the next [`rate_limit`](Self::rate_limit)
    /// only reports headers from responses received after this call.
    pub fn reset_rate_limit(&self) {
        if let Ok(mut last) = self.last_rate.lock() {
            *last = None;
        }
    }

    /// Rate limit from the most recent response since the last reset, or from
    /// `/rate_limit` when none has carried the headers.
    pub async fn rate_limit(&self) -> Result<RateLimit, ClientError> {
        if let Some(rate) = self.last_rate.lock().ok().and_then(|last| *last) {
            return Ok(rate);
        }
        let resp: RateLimitResponse = self.get_json(&self.rate_url).await?;
        Ok(resp.rate)
    }
}

/// Extract the `rel="next"` URL from a `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (url, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim() == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let url = url.trim().strip_prefix('<')?.strip_suffix('>')?;
        Some(url.to_string())
    })
}
