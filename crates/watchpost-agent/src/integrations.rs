use watchpost_core::{ConfiguredIntegration, IntegrationError, IntegrationRegistry};

use crate::config::AgentConfig;

/// Registry with every integration compiled into this build.
pub fn default_registry(instance: &str) -> IntegrationRegistry {
    #[allow(unused_mut)]
    let mut registry = IntegrationRegistry::with_default_instance(instance);
    #[cfg(feature = "github")]
    registry.register::<watchpost_github::GitHubExporterConfig>();
    registry
}

fn is_disabled(block: &serde_yaml::Value) -> bool {
    block.get("enabled").and_then(serde_yaml::Value::as_bool) == Some(false)
}

/// Construct every enabled integration named in the config.
///
/// Integrations are built one after another; a failure aborts start-up.
pub fn build_integrations(
    config: &AgentConfig,
    registry: &IntegrationRegistry,
) -> Result<Vec<ConfiguredIntegration>, IntegrationError> {
    build_integrations_with_env(config, registry, |key| std::env::var(key).ok())
}

/// [`build_integrations`] with environment variables read through `lookup`.
#[cfg_attr(not(feature = "github"), allow(unused_variables))]
pub fn build_integrations_with_env(
    config: &AgentConfig,
    registry: &IntegrationRegistry,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Vec<ConfiguredIntegration>, IntegrationError> {
    let mut built = Vec::new();
    for (name, block) in &config.integrations {
        if is_disabled(block) {
            tracing::info!(integration = %name, "Integration disabled, skipping");
            continue;
        }
        let integration = registry.build(name, block.clone())?;
        tracing::info!(
            integration = %name,
            instance = %integration.instance,
            scrape_interval = ?integration.common.scrape_interval,
            "Integration constructed"
        );
        built.push(integration);
    }

    #[cfg(feature = "github")]
    {
        if !config
            .integrations
            .contains_key(watchpost_github::INTEGRATION_NAME)
            && let Some(github) = github_from_env(lookup)?
        {
            built.push(github);
        }
    }

    Ok(built)
}

/// Standalone fallback: build the GitHub exporter from `REPOS`/`ORGS`/`USERS`
/// and friends when the config file has no block for it.
#[cfg(feature = "github")]
fn github_from_env(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<ConfiguredIntegration>, IntegrationError> {
    use watchpost_core::CommonConfig;
    use watchpost_github::{ExporterSettings, INTEGRATION_NAME};

    let settings = ExporterSettings::from_env_with(lookup);
    if !settings.has_targets() {
        return Ok(None);
    }
    let instance = settings.instance_key();
    tracing::info!(%instance, "Building GitHub exporter from environment");
    let integration = watchpost_github::from_settings(settings)?;
    Ok(Some(ConfiguredIntegration {
        name: INTEGRATION_NAME.to_string(),
        instance,
        common: CommonConfig::default(),
        integration: Box::new(integration),
    }))
}
