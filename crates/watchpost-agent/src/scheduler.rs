use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use watchpost_core::{ConfiguredIntegration, IntegrationError, encode_text};

use crate::state::{AgentState, SharedSnapshotStore};

/// Scrape `integration` once, bounded by its `scrape_timeout`, and encode the
/// result as exposition text.
pub async fn scrape_once(integration: &ConfiguredIntegration) -> Result<String, IntegrationError> {
    let timeout = integration.common.scrape_timeout;
    let families = tokio::time::timeout(timeout, integration.scrape())
        .await
        .map_err(|_| IntegrationError::Timeout {
            name: integration.name.clone(),
            after: timeout,
        })??;
    encode_text(&families)
}

/// Spawn one periodic scrape task per scheduled integration.
pub fn spawn_scheduler(state: &AgentState, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
    state
        .scheduled()
        .map(|integration| {
            tokio::spawn(run_schedule(
                Arc::clone(integration),
                Arc::clone(&state.snapshots),
                cancel.clone(),
            ))
        })
        .collect()
}

async fn run_schedule(
    integration: Arc<ConfiguredIntegration>,
    snapshots: SharedSnapshotStore,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(integration.common.scrape_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(
        integration = %integration.name,
        interval = ?integration.common.scrape_interval,
        "Scheduling integration"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(integration = %integration.name, "Scheduler stopping");
                break;
            }
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        let result = scrape_once(&integration).await;
        let elapsed = started.elapsed();

        let mut store = snapshots.write().await;
        match result {
            Ok(text) => {
                tracing::debug!(integration = %integration.name, ?elapsed, "Scheduled scrape complete");
                store.record_success(&integration.name, text, elapsed);
            },
            Err(e) => {
                tracing::warn!(integration = %integration.name, error = %e, "Scheduled scrape failed");
                store.record_failure(&integration.name, elapsed);
            },
        }
    }
}
