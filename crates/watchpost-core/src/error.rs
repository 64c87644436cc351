use std::time::Duration;

/// Errors raised while building or scraping an integration.
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("no integration registered under the name {0:?}")]
    UnknownIntegration(String),

    #[error("invalid configuration for integration {name}: {source}")]
    InvalidConfig {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0}")]
    Validation(String),

    #[error("failed to construct integration {name}: {reason}")]
    Construction { name: String, reason: String },

    #[error("scrape of integration {name} timed out after {after:?}")]
    Timeout { name: String, after: Duration },

    #[error("failed to encode metrics: {0}")]
    Encode(#[from] prometheus::Error),
}
