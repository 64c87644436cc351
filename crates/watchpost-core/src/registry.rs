use std::collections::HashMap;

use prometheus::proto::MetricFamily;
use serde::de::DeserializeOwned;

use crate::collector::apply_instance_label;
use crate::common::CommonConfig;
use crate::error::IntegrationError;
use crate::integration::{Integration, IntegrationConfig};

/// An integration built from its YAML block, together with the common
/// settings the host needs to schedule it.
pub struct ConfiguredIntegration {
    pub name: String,
    pub instance: String,
    pub common: CommonConfig,
    pub integration: Box<dyn Integration>,
}

impl std::fmt::Debug for ConfiguredIntegration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredIntegration")
            .field("name", &self.name)
            .field("instance", &self.instance)
            .field("common", &self.common)
            .finish_non_exhaustive()
    }
}

impl ConfiguredIntegration {
    /// Scrape the integration and label every sample with `instance`.
    pub async fn scrape(&self) -> Result<Vec<MetricFamily>, IntegrationError> {
        let mut families = self.integration.scrape().await?;
        apply_instance_label(&mut families, &self.instance);
        Ok(families)
    }
}

type IntegrationFactory =
    Box<dyn Fn(serde_yaml::Value) -> Result<ConfiguredIntegration, IntegrationError> + Send + Sync>;

/// Registry mapping integration names to config-driven factories.
pub struct IntegrationRegistry {
    factories: HashMap<&'static str, IntegrationFactory>,
    default_instance: String,
}

impl Default for IntegrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::with_default_instance("localhost")
    }

    /// Registry whose integrations label samples with `instance` unless their
    /// config overrides it.
    pub fn with_default_instance(instance: impl Into<String>) -> Self {
        Self {
            factories: HashMap::new(),
            default_instance: instance.into(),
        }
    }

    /// Register the config type `C` under the name its default value reports.
    pub fn register<C>(&mut self)
    where
        C: IntegrationConfig + DeserializeOwned + Default + 'static,
    {
        let name = C::default().name();
        let default_instance = self.default_instance.clone();
        let factory: IntegrationFactory = Box::new(move |block| {
            // A bare `github_exporter:` key parses as null; treat it as "all defaults".
            let config: C = if block.is_null() {
                C::default()
            } else {
                serde_yaml::from_value(block).map_err(|source| IntegrationError::InvalidConfig {
                    name: name.to_string(),
                    source,
                })?
            };
            config.common().validate(name)?;
            let integration = config.new_integration()?;
            Ok(ConfiguredIntegration {
                name: name.to_string(),
                instance: config.instance_key(&default_instance),
                common: config.common().clone(),
                integration,
            })
        });

        if self.factories.insert(name, factory).is_some() {
            tracing::warn!(integration = name, "Integration registered twice, replacing");
        } else {
            tracing::debug!(integration = name, "Registered integration");
        }
    }

    /// Deserialize `block` into the config registered under `name` and build it.
    pub fn build(
        &self,
        name: &str,
        block: serde_yaml::Value,
    ) -> Result<ConfiguredIntegration, IntegrationError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| IntegrationError::UnknownIntegration(name.to_string()))?;
        factory(block)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::collector::CollectorIntegration;
    use crate::test_helpers::CountingCollector;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct NoopConfig {
        #[serde(flatten)]
        common: CommonConfig,
        target: String,
    }

    impl IntegrationConfig for NoopConfig {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn common(&self) -> &CommonConfig {
            &self.common
        }

        fn new_integration(&self) -> Result<Box<dyn Integration>, IntegrationError> {
            if self.target == "broken" {
                return Err(IntegrationError::Construction {
                    name: "noop".to_string(),
                    reason: "broken target".to_string(),
                });
            }
            Ok(Box::new(
                CollectorIntegration::new(self.name()).with_collector(CountingCollector::default()),
            ))
        }
    }

    fn registry() -> IntegrationRegistry {
        let mut registry = IntegrationRegistry::new();
        registry.register::<NoopConfig>();
        registry
    }

    #[test]
    fn register_keys_by_config_name() {
        let registry = registry();
        assert!(registry.contains("noop"));
        assert_eq!(registry.names(), vec!["noop"]);
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn registering_twice_replaces() {
        let mut registry = registry();
        registry.register::<NoopConfig>();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn build_unknown_name_fails() {
        let err = registry()
            .build("missing", serde_yaml::Value::Null)
            .unwrap_err();
        assert!(matches!(err, IntegrationError::UnknownIntegration(ref n) if n == "missing"));
    }

    #[test]
    fn build_null_block_uses_defaults() {
        let built = registry().build("noop", serde_yaml::Value::Null).unwrap();
        assert_eq!(built.name, "noop");
        assert_eq!(built.instance, "localhost");
        assert_eq!(built.common, CommonConfig::default());
        assert_eq!(built.integration.name(), "noop");
    }

    #[test]
    fn build_applies_instance_override() {
        let block: serde_yaml::Value =
            serde_yaml::from_str("instance: build-farm\ntarget: ok\n").unwrap();
        let built = registry().build("noop", block).unwrap();
        assert_eq!(built.instance, "build-farm");
    }

    #[test]
    fn build_rejects_bad_yaml_shape() {
        let block: serde_yaml::Value = serde_yaml::from_str("target: [1, 2]\n").unwrap();
        let err = registry().build("noop", block).unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidConfig { .. }));
    }

    #[test]
    fn build_runs_common_validation() {
        let block: serde_yaml::Value =
            serde_yaml::from_str("scrape_interval: 5s\nscrape_timeout: 10s\n").unwrap();
        let err = registry().build("noop", block).unwrap_err();
        assert!(matches!(err, IntegrationError::Validation(_)));
    }

    #[test]
    fn build_surfaces_construction_errors() {
        let block: serde_yaml::Value = serde_yaml::from_str("target: broken\n").unwrap();
        let err = registry().build("noop", block).unwrap_err();
        assert!(matches!(err, IntegrationError::Construction { .. }));
    }

    fn instance_of(families: &[MetricFamily]) -> Vec<&str> {
        families
            .iter()
            .flat_map(|f| f.get_metric())
            .filter_map(|m| m.get_label().iter().find(|l| l.get_name() == "instance"))
            .map(|l| l.get_value())
            .collect()
    }

    #[tokio::test]
    async fn scrape_labels_samples_with_default_instance() {
        let mut registry = IntegrationRegistry::with_default_instance("ci-runner-3");
        registry.register::<NoopConfig>();
        let built = registry.build("noop", serde_yaml::Value::Null).unwrap();

        let families = built.scrape().await.unwrap();
        assert!(!families.is_empty());
        assert_eq!(instance_of(&families), vec!["ci-runner-3"]);
    }

    #[tokio::test]
    async fn scrape_labels_samples_with_configured_instance() {
        let block: serde_yaml::Value = serde_yaml::from_str("instance: build-farm\n").unwrap();
        let built = registry().build("noop", block).unwrap();

        let families = built.scrape().await.unwrap();
        assert_eq!(instance_of(&families), vec!["build-farm"]);
    }
}
