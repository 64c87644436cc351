pub mod collector;
pub mod common;
pub mod error;
pub mod integration;
pub mod registry;

pub use collector::{CollectorIntegration, encode_text};
pub use common::CommonConfig;
pub use error::IntegrationError;
pub use integration::{Integration, IntegrationConfig, MetricsCollector};
pub use registry::{ConfiguredIntegration, IntegrationRegistry};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::FutureExt;
    use futures::future::BoxFuture;
    use prometheus::proto::MetricFamily;
    use prometheus::{Gauge, Opts, Registry};
    use serde::Deserialize;

    use crate::collector::CollectorIntegration;
    use crate::common::CommonConfig;
    use crate::error::IntegrationError;
    use crate::integration::{Integration, IntegrationConfig, MetricsCollector};

    /// Build a single-sample gauge family.
    pub fn gauge_family(name: &str, value: f64) -> Vec<MetricFamily> {
        let registry = Registry::new();
        let gauge = Gauge::with_opts(Opts::new(name, "test gauge")).unwrap();
        gauge.set(value);
        registry.register(Box::new(gauge)).unwrap();
        registry.gather()
    }

    /// Collector that reports how many times it has been collected, optionally
    /// sleeping first to exercise scrape timeouts.
    #[derive(Clone, Default)]
    pub struct CountingCollector {
        pub calls: Arc<AtomicUsize>,
        pub delay: Option<Duration>,
    }

    impl MetricsCollector for CountingCollector {
        fn collect(&self) -> BoxFuture<'_, Vec<MetricFamily>> {
            async move {
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
                gauge_family("test_collections", n as f64)
            }
            .boxed()
        }
    }

    /// Minimal integration config for host-side tests.
    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    pub struct TestIntegrationConfig {
        #[serde(flatten)]
        pub common: CommonConfig,
        pub delay_ms: u64,
    }

    impl IntegrationConfig for TestIntegrationConfig {
        fn name(&self) -> &'static str {
            "test_integration"
        }

        fn common(&self) -> &CommonConfig {
            &self.common
        }

        fn new_integration(&self) -> Result<Box<dyn Integration>, IntegrationError> {
            let collector = CountingCollector {
                delay: (self.delay_ms > 0).then(|| Duration::from_millis(self.delay_ms)),
                ..CountingCollector::default()
            };
            Ok(Box::new(
                CollectorIntegration::new(self.name()).with_collector(collector),
            ))
        }
    }
}
