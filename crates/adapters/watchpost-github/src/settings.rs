use std::path::Path;

use crate::config::{DEFAULT_API_URL, GitHubExporterConfig, redacted};

/// Environment variables read by [`ExporterSettings::from_env`].
pub const ENV_API_URL: &str = "API_URL";
pub const ENV_REPOS: &str = "REPOS";
pub const ENV_ORGS: &str = "ORGS";
pub const ENV_USERS: &str = "USERS";
pub const ENV_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_TOKEN_FILE: &str = "GITHUB_TOKEN_FILE";

/// Every variable name the standalone exporter reads.
pub const ENV_VARS: [&str; 6] = [
    ENV_API_URL,
    ENV_REPOS,
    ENV_ORGS,
    ENV_USERS,
    ENV_TOKEN,
    ENV_TOKEN_FILE,
];

/// Resolved exporter configuration: where to scrape and how to authenticate.
#[derive(Clone, PartialEq, Eq)]
pub struct ExporterSettings {
    pub api_url: String,
    pub repositories: Vec<String>,
    pub organizations: Vec<String>,
    pub users: Vec<String>,
    pub token: Option<String>,
}

/// What a target URL returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// A single repository object.
    Repository,
    /// A paginated list of an organization's repositories.
    OrganizationRepos,
    /// A paginated list of a user's repositories.
    UserRepos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub kind: TargetKind,
    pub url: String,
}

impl std::fmt::Debug for ExporterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExporterSettings")
            .field("api_url", &self.api_url)
            .field("repositories", &self.repositories)
            .field("organizations", &self.organizations)
            .field("users", &self.users)
            .field("token", &redacted(self.token.as_deref().unwrap_or_default()))
            .finish()
    }
}

impl From<&GitHubExporterConfig> for ExporterSettings {
    fn from(config: &GitHubExporterConfig) -> Self {
        Self {
            api_url: non_empty(&config.api_url)
                .unwrap_or(DEFAULT_API_URL)
                .to_string(),
            repositories: clean_list(&config.repositories),
            organizations: clean_list(&config.organizations),
            users: clean_list(&config.users),
            token: resolve_token(&config.api_token, &config.api_token_file),
        }
    }
}

impl ExporterSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).unwrap_or_default();
        Self {
            api_url: non_empty(&var(ENV_API_URL))
                .unwrap_or(DEFAULT_API_URL)
                .to_string(),
            repositories: split_list(&var(ENV_REPOS)),
            organizations: split_list(&var(ENV_ORGS)),
            users: split_list(&var(ENV_USERS)),
            token: resolve_token(&var(ENV_TOKEN), &var(ENV_TOKEN_FILE)),
        }
    }

    /// `api_url` without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn rate_limit_url(&self) -> String {
        format!("{}/rate_limit", self.base_url())
    }

    /// URLs to scrape, in repository, organization, user order.
    pub fn targets(&self) -> Vec<Target> {
        let base = self.base_url();
        let repos = self.repositories.iter().map(|repo| Target {
            kind: TargetKind::Repository,
            url: format!("{base}/repos/{repo}"),
        });
        let orgs = self.organizations.iter().map(|org| Target {
            kind: TargetKind::OrganizationRepos,
            url: format!("{base}/orgs/{org}/repos"),
        });
        let users = self.users.iter().map(|user| Target {
            kind: TargetKind::UserRepos,
            url: format!("{base}/users/{user}/repos"),
        });
        repos.chain(orgs).chain(users).collect()
    }

    pub fn has_targets(&self) -> bool {
        !(self.repositories.is_empty() && self.organizations.is_empty() && self.users.is_empty())
    }

    /// Default `instance` label: the host the API is served from.
    pub fn instance_key(&self) -> String {
        api_host(&self.api_url)
    }
}

/// Authority part of `api_url`, e.g. `ghe.example.com` for
/// `https://ghe.example.com/api/v3`. Blank means the public API.
pub(crate) fn api_host(api_url: &str) -> String {
    let url = non_empty(api_url).unwrap_or(DEFAULT_API_URL);
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_string()
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn clean_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .filter_map(|s| non_empty(s))
        .map(str::to_string)
        .collect()
}

/// Split an env list on commas and whitespace.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// An inline token wins; the file is only read when no inline token is set.
fn resolve_token(inline: &str, file: &str) -> Option<String> {
    if let Some(token) = non_empty(inline) {
        return Some(token.to_string());
    }
    let path = non_empty(file)?;
    match read_token_file(Path::new(path)) {
        Ok(Some(token)) => Some(token),
        Ok(None) => {
            tracing::warn!(path, "GitHub token file is empty, scraping unauthenticated");
            None
        },
        Err(e) => {
            tracing::warn!(path, error = %e, "Failed to read GitHub token file, scraping unauthenticated");
            None
        },
    }
}

fn read_token_file(path: &Path) -> std::io::Result<Option<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(non_empty(&content).map(str::to_string))
}
