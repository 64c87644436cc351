use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use watchpost_core::ConfiguredIntegration;

use crate::config::AgentConfig;
use crate::snapshot::SnapshotStore;

pub type SharedSnapshotStore = Arc<RwLock<SnapshotStore>>;

#[derive(Clone)]
pub struct AgentState {
    /// Constructed integrations keyed by name.
    pub integrations: Arc<BTreeMap<String, Arc<ConfiguredIntegration>>>,
    pub snapshots: SharedSnapshotStore,
    pub config: Arc<AgentConfig>,
}

impl AgentState {
    pub fn new(config: AgentConfig, integrations: Vec<ConfiguredIntegration>) -> Self {
        let integrations = integrations
            .into_iter()
            .map(|i| (i.name.clone(), Arc::new(i)))
            .collect();
        Self {
            integrations: Arc::new(integrations),
            snapshots: Arc::new(RwLock::new(SnapshotStore::new())),
            config: Arc::new(config),
        }
    }

    /// Integrations the scheduler is responsible for.
    pub fn scheduled(&self) -> impl Iterator<Item = &Arc<ConfiguredIntegration>> {
        self.integrations
            .values()
            .filter(|i| i.common.scrape_integration)
    }
}
