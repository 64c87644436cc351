use std::collections::BTreeMap;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt, stream};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts, Registry};

use watchpost_core::MetricsCollector;

use crate::client::{GitHubClient, RateLimit, Release, Repository};
use crate::settings::{ExporterSettings, TargetKind};

/// Repositories enriched concurrently per scrape.
const REPO_CONCURRENCY: usize = 4;

const REPO_LABELS: &[&str] = &[
    "repo", "user", "private", "fork", "archived", "license", "language",
];

/// Collector exporting repository statistics and API rate limits.
pub struct GitHubExporter {
    settings: ExporterSettings,
    client: GitHubClient,
}

/// Per-repository data gathered during one scrape.
struct RepoSample {
    repo: Repository,
    pull_requests: Option<usize>,
    releases: Vec<Release>,
}

struct RepoGauges {
    stars: GaugeVec,
    forks: GaugeVec,
    open_issues: GaugeVec,
    watchers: GaugeVec,
    size_kb: GaugeVec,
    pull_requests: GaugeVec,
    release_downloads: GaugeVec,
}

impl RepoGauges {
    fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let repo_gauge = |name: &str, help: &str| -> Result<GaugeVec, prometheus::Error> {
            let gauge = GaugeVec::new(Opts::new(name, help), REPO_LABELS)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let pull_requests = GaugeVec::new(
            Opts::new(
                "github_repo_pull_request_count",
                "Total number of open pull requests for a given repository",
            ),
            &["repo", "user"],
        )?;
        registry.register(Box::new(pull_requests.clone()))?;

        let release_downloads = GaugeVec::new(
            Opts::new(
                "github_repo_release_downloads",
                "Download count for a given release asset",
            ),
            &["repo", "user", "release", "name", "created_at"],
        )?;
        registry.register(Box::new(release_downloads.clone()))?;

        Ok(Self {
            stars: repo_gauge("github_repo_stars", "Total number of stars for a given repository")?,
            forks: repo_gauge("github_repo_forks", "Total number of forks for a given repository")?,
            open_issues: repo_gauge(
                "github_repo_open_issues",
                "Total number of open issues for a given repository",
            )?,
            watchers: repo_gauge(
                "github_repo_watchers",
                "Total number of watchers/subscribers for a given repository",
            )?,
            size_kb: repo_gauge("github_repo_size_kb", "Size in KB for a given repository")?,
            pull_requests,
            release_downloads,
        })
    }

    fn observe(&self, sample: &RepoSample) {
        let repo = &sample.repo;
        let license = repo.license.as_ref().map(|l| l.key.as_str()).unwrap_or("");
        let private = repo.private.to_string();
        let fork = repo.fork.to_string();
        let archived = repo.archived.to_string();
        let labels = [
            repo.name.as_str(),
            repo.owner.login.as_str(),
            private.as_str(),
            fork.as_str(),
            archived.as_str(),
            license,
            repo.language.as_deref().unwrap_or(""),
        ];

        // GitHub counts pull requests as issues.
        let open_issues = match sample.pull_requests {
            Some(prs) => repo.open_issues_count.saturating_sub(prs as u64),
            None => repo.open_issues_count,
        };

        self.stars
            .with_label_values(&labels)
            .set(repo.stargazers_count as f64);
        self.forks.with_label_values(&labels).set(repo.forks_count as f64);
        self.open_issues.with_label_values(&labels).set(open_issues as f64);
        self.watchers
            .with_label_values(&labels)
            .set(repo.watchers_count as f64);
        self.size_kb.with_label_values(&labels).set(repo.size as f64);

        if let Some(prs) = sample.pull_requests {
            self.pull_requests
                .with_label_values(&[repo.name.as_str(), repo.owner.login.as_str()])
                .set(prs as f64);
        }

        for release in &sample.releases {
            let release_name = release
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(release.tag_name.as_str());
            for asset in &release.assets {
                self.release_downloads
                    .with_label_values(&[
                        repo.name.as_str(),
                        repo.owner.login.as_str(),
                        release_name,
                        asset.name.as_str(),
                        asset.created_at.as_str(),
                    ])
                    .set(asset.download_count as f64);
            }
        }
    }
}

/// Register the rate-limit gauges; they are only present when the limit is known.
fn register_rate_limit(registry: &Registry, rate: RateLimit) -> Result<(), prometheus::Error> {
    let gauges = [
        (
            "github_rate_limit",
            "Number of API queries allowed in a 60 minute window",
            rate.limit,
        ),
        (
            "github_rate_remaining",
            "Number of API queries remaining in the current window",
            rate.remaining,
        ),
        (
            "github_rate_reset",
            "The time at which the current rate limit window resets in UTC epoch seconds",
            rate.reset,
        ),
    ];
    for (name, help, value) in gauges {
        let gauge = Gauge::with_opts(Opts::new(name, help))?;
        gauge.set(value as f64);
        registry.register(Box::new(gauge))?;
    }
    Ok(())
}

impl GitHubExporter {
    pub fn new(settings: ExporterSettings) -> Result<Self, reqwest::Error> {
        let client = GitHubClient::new(&settings)?;
        if !settings.has_targets() {
            tracing::warn!(
                api_url = %settings.api_url,
                "GitHub exporter has no repositories, organizations, or users to monitor"
            );
        }
        if !client.is_authenticated() {
            tracing::info!("GitHub exporter running unauthenticated, API rate limits are low");
        }
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &ExporterSettings {
        &self.settings
    }

    /// Resolve every target into repositories, de-duplicated by full name.
    async fn resolve_repositories(&self) -> Vec<Repository> {
        let mut repos = BTreeMap::new();
        for target in self.settings.targets() {
            let fetched = match target.kind {
                TargetKind::Repository => self.client.repository(&target.url).await.map(|r| vec![r]),
                TargetKind::OrganizationRepos | TargetKind::UserRepos => {
                    self.client.repository_list(&target.url).await
                },
            };
            match fetched {
                Ok(list) => {
                    for repo in list {
                        repos.insert(repo.full_name.clone(), repo);
                    }
                },
                Err(e) => {
                    tracing::warn!(url = %target.url, error = %e, "Failed to fetch GitHub target");
                },
            }
        }
        repos.into_values().collect()
    }

    async fn sample(&self, repo: Repository) -> RepoSample {
        let pull_requests = match self.client.pull_request_count(&repo.url).await {
            Ok(n) => Some(n),
            Err(e) => {
                tracing::warn!(repo = %repo.full_name, error = %e, "Failed to count pull requests");
                None
            },
        };
        let releases = match self.client.releases(&repo.url).await {
            Ok(releases) => releases,
            Err(e) => {
                tracing::warn!(repo = %repo.full_name, error = %e, "Failed to fetch releases");
                Vec::new()
            },
        };
        RepoSample {
            repo,
            pull_requests,
            releases,
        }
    }

    async fn scrape(&self) -> Result<Vec<MetricFamily>, prometheus::Error> {
        let registry = Registry::new();
        let gauges = RepoGauges::register(&registry)?;
        self.client.reset_rate_limit();

        let repos = self.resolve_repositories().await;
        let samples: Vec<RepoSample> = stream::iter(repos)
            .map(|repo| self.sample(repo))
            .buffer_unordered(REPO_CONCURRENCY)
            .collect()
            .await;
        for sample in &samples {
            gauges.observe(sample);
        }

        match self.client.rate_limit().await {
            Ok(rate) => register_rate_limit(&registry, rate)?,
            Err(e) => tracing::warn!(error = %e, "Failed to fetch GitHub rate limit"),
        }

        tracing::debug!(repositories = samples.len(), "GitHub scrape complete");
        Ok(registry.gather())
    }
}

impl MetricsCollector for GitHubExporter {
    fn collect(&self) -> BoxFuture<'_, Vec<MetricFamily>> {
        async move {
            match self.scrape().await {
                Ok(families) => families,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build GitHub metrics");
                    Vec::new()
                },
            }
        }
        .boxed()
    }
}
