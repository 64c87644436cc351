pub mod client;
pub mod config;
pub mod exporter;
pub mod settings;

pub use client::GitHubClient;
pub use config::GitHubExporterConfig;
pub use exporter::GitHubExporter;
pub use settings::ExporterSettings;

use watchpost_core::{CollectorIntegration, IntegrationError};

/// Registry name of the integration.
pub const INTEGRATION_NAME: &str = "github_exporter";

/// Build the `github_exporter` integration.
///
/// Settings are handed to the exporter directly; nothing is read from or
/// written to the process environment.
pub fn new_integration(
    config: &GitHubExporterConfig,
) -> Result<CollectorIntegration, IntegrationError> {
    from_settings(ExporterSettings::from(config))
}

/// Build the integration from already-resolved settings, e.g. ones read by
/// [`ExporterSettings::from_env`].
pub fn from_settings(settings: ExporterSettings) -> Result<CollectorIntegration, IntegrationError> {
    tracing::debug!(?settings, "Building GitHub exporter");
    let exporter = GitHubExporter::new(settings).map_err(|e| IntegrationError::Construction {
        name: INTEGRATION_NAME.to_string(),
        reason: e.to_string(),
    })?;
    Ok(CollectorIntegration::new(INTEGRATION_NAME).with_collector(exporter))
}
