use futures::FutureExt;
use futures::future::BoxFuture;
use prometheus::proto::{LabelPair, MetricFamily};
use prometheus::{Encoder, TextEncoder};

use crate::error::IntegrationError;
use crate::integration::{Integration, MetricsCollector};

/// Integration made of one or more [`MetricsCollector`]s.
pub struct CollectorIntegration {
    name: String,
    collectors: Vec<Box<dyn MetricsCollector>>,
}

impl CollectorIntegration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collectors: Vec::new(),
        }
    }

    pub fn with_collector(mut self, collector: impl MetricsCollector + 'static) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }
}

impl Integration for CollectorIntegration {
    fn name(&self) -> &str {
        &self.name
    }

    fn scrape(&self) -> BoxFuture<'_, Result<Vec<MetricFamily>, IntegrationError>> {
        async move {
            let mut families = Vec::new();
            for collector in &self.collectors {
                families.extend(collector.collect().await);
            }
            families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
            tracing::debug!(
                integration = %self.name,
                families = families.len(),
                "Scrape complete"
            );
            Ok(families)
        }
        .boxed()
    }
}

/// Set `instance` on every sample, replacing any existing value.
pub(crate) fn apply_instance_label(families: &mut [MetricFamily], instance: &str) {
    for family in families.iter_mut() {
        for metric in family.mut_metric().iter_mut() {
            let labels = metric.mut_label();
            if let Some(existing) = labels.iter_mut().find(|l| l.get_name() == "instance") {
                existing.set_value(instance.to_string());
                continue;
            }
            let mut pair = LabelPair::new();
            pair.set_name("instance".to_string());
            pair.set_value(instance.to_string());
            labels.push(pair);
        }
    }
}

/// Render metric families in the Prometheus text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, IntegrationError> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(families, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
