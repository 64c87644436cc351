use futures::future::BoxFuture;
use prometheus::proto::MetricFamily;

use crate::common::CommonConfig;
use crate::error::IntegrationError;

/// Typed configuration block for one integration.
///
/// Implementations are deserialized from the integration's YAML block by the
/// [`IntegrationRegistry`](crate::registry::IntegrationRegistry) and then
/// consumed once to build the running integration.
pub trait IntegrationConfig: Send + Sync {
    /// Registry key and YAML block name, e.g. `github_exporter`.
    fn name(&self) -> &'static str;

    /// Settings inherited from the host.
    fn common(&self) -> &CommonConfig;

    /// Build the running integration from this configuration.
    fn new_integration(&self) -> Result<Box<dyn Integration>, IntegrationError>;

    /// Value for the `instance` label, falling back to `default` when the
    /// config does not override it.
    fn instance_key(&self, default: &str) -> String {
        self.common()
            .instance
            .clone()
            .unwrap_or_else(|| default.to_string())
    }
}

/// A constructed integration the host can schedule and expose.
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;

    /// Gather the current samples of every collector this integration owns.
    fn scrape(&self) -> BoxFuture<'_, Result<Vec<MetricFamily>, IntegrationError>>;
}

/// Producer of metric families, wrapped by a
/// [`CollectorIntegration`](crate::collector::CollectorIntegration).
///
/// Collection is infallible from the host's point of view: collectors log
/// their own failures and return whatever they could gather.
pub trait MetricsCollector: Send + Sync {
    fn collect(&self) -> BoxFuture<'_, Vec<MetricFamily>>;
}
