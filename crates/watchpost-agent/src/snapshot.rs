use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts, Registry};

/// Result of the latest scheduled scrape of one integration.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Exposition-format text of the last successful scrape.
    pub text: String,
    pub scraped_at: SystemTime,
    pub duration: Duration,
    /// Whether the most recent attempt succeeded. A failed attempt keeps the
    /// previous text.
    pub up: bool,
}

/// Latest snapshot per integration, keyed by integration name.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: BTreeMap<String, Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, name: &str, text: String, duration: Duration) {
        self.snapshots.insert(
            name.to_string(),
            Snapshot {
                text,
                scraped_at: SystemTime::now(),
                duration,
                up: true,
            },
        );
    }

    pub fn record_failure(&mut self, name: &str, duration: Duration) {
        let entry = self
            .snapshots
            .entry(name.to_string())
            .or_insert_with(|| Snapshot {
                text: String::new(),
                scraped_at: SystemTime::now(),
                duration,
                up: false,
            });
        entry.scraped_at = SystemTime::now();
        entry.duration = duration;
        entry.up = false;
    }

    pub fn get(&self, name: &str) -> Option<&Snapshot> {
        self.snapshots.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshots.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Concatenated snapshot text in integration-name order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for snapshot in self.snapshots.values() {
            out.push_str(&snapshot.text);
            if !snapshot.text.is_empty() && !snapshot.text.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }

    /// Agent-level families describing scrape health per integration.
    pub fn health_families(&self) -> Result<Vec<MetricFamily>, prometheus::Error> {
        let registry = Registry::new();
        let up = GaugeVec::new(
            Opts::new(
                "watchpost_integration_up",
                "Whether the last scheduled scrape of the integration succeeded",
            ),
            &["integration"],
        )?;
        let duration = GaugeVec::new(
            Opts::new(
                "watchpost_integration_scrape_duration_seconds",
                "Duration of the last scheduled scrape of the integration",
            ),
            &["integration"],
        )?;
        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        for (name, snapshot) in &self.snapshots {
            up.with_label_values(&[name.as_str()])
                .set(if snapshot.up { 1.0 } else { 0.0 });
            duration
                .with_label_values(&[name.as_str()])
                .set(snapshot.duration.as_secs_f64());
        }
        Ok(registry.gather())
    }
}
