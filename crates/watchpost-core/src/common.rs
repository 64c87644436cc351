use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;

/// Settings shared by every integration, flattened into each integration's
/// own YAML block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonConfig {
    pub enabled: bool,
    /// Overrides the `instance` label attached to every sample.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// When false the host never schedules the integration; it can still be
    /// scraped on demand.
    pub scrape_integration: bool,
    #[serde(with = "humantime_serde")]
    pub scrape_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub scrape_timeout: Duration,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instance: None,
            scrape_integration: true,
            scrape_interval: Duration::from_secs(60),
            scrape_timeout: Duration::from_secs(10),
        }
    }
}

impl CommonConfig {
    pub fn validate(&self, integration: &str) -> Result<(), IntegrationError> {
        if self.scrape_interval.is_zero() {
            return Err(IntegrationError::Validation(format!(
                "{integration}: scrape_interval must be > 0"
            )));
        }
        if self.scrape_timeout.is_zero() {
            return Err(IntegrationError::Validation(format!(
                "{integration}: scrape_timeout must be > 0"
            )));
        }
        if self.scrape_timeout > self.scrape_interval {
            return Err(IntegrationError::Validation(format!(
                "{integration}: scrape_timeout ({:?}) exceeds scrape_interval ({:?})",
                self.scrape_timeout, self.scrape_interval
            )));
        }
        Ok(())
    }
}
