use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use watchpost_agent::build_app;
use watchpost_agent::config::AgentConfig;
use watchpost_agent::integrations::{build_integrations, default_registry};
use watchpost_agent::scheduler::spawn_scheduler;
use watchpost_agent::state::AgentState;
use watchpost_core::test_helpers::TestIntegrationConfig;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AgentState,
    cancel: CancellationToken,
    _server: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start an agent with the given `integrations:` blocks. The test
    /// integration is registered alongside the built-in ones.
    pub async fn with_integrations(blocks: &[(&str, &str)]) -> Self {
        let integrations: BTreeMap<_, _> = blocks
            .iter()
            .map(|(name, yaml)| (name.to_string(), serde_yaml::from_str(yaml).unwrap()))
            .collect();
        let config = AgentConfig {
            integrations,
            ..AgentConfig::default()
        };

        let mut registry = default_registry(&config.server.instance);
        registry.register::<TestIntegrationConfig>();
        let built = build_integrations(&config, &registry).unwrap();

        let state = AgentState::new(config, built);
        let cancel = CancellationToken::new();
        spawn_scheduler(&state, cancel.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_app(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            cancel,
            _server: handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Poll `/-/ready` until it reports ready (5s timeout).
    pub async fn wait_ready(&self) {
        let deadline = Duration::from_secs(5);
        tokio::time::timeout(deadline, async {
            loop {
                let resp = reqwest::get(self.url("/-/ready")).await.unwrap();
                if resp.status().is_success() {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Timed out waiting for readiness");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
