use serde::{Deserialize, Deserializer, Serialize};

use watchpost_core::{CommonConfig, Integration, IntegrationConfig, IntegrationError};

/// Public GitHub REST API, used when `api_url` is omitted.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// YAML block for the `github_exporter` integration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubExporterConfig {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub api_url: String,
    /// Repositories to monitor in "owner/repo" format.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<String>,
    /// Organizations whose repositories are all monitored.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<String>,
    /// Users whose repositories are all monitored.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub api_token: String,
    /// File holding the token. Ignored when `api_token` is set.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub api_token_file: String,
}

impl Default for GitHubExporterConfig {
    fn default() -> Self {
        Self {
            common: CommonConfig::default(),
            api_url: DEFAULT_API_URL.to_string(),
            repositories: Vec::new(),
            organizations: Vec::new(),
            users: Vec::new(),
            api_token: String::new(),
            api_token_file: String::new(),
        }
    }
}

impl std::fmt::Debug for GitHubExporterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubExporterConfig")
            .field("common", &self.common)
            .field("api_url", &self.api_url)
            .field("repositories", &self.repositories)
            .field("organizations", &self.organizations)
            .field("users", &self.users)
            .field("api_token", &redacted(&self.api_token))
            .field("api_token_file", &self.api_token_file)
            .finish()
    }
}

/// A bare key (`repositories:`) parses as null; treat it like an omitted one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "<redacted>" }
}

impl IntegrationConfig for GitHubExporterConfig {
    fn name(&self) -> &'static str {
        crate::INTEGRATION_NAME
    }

    fn common(&self) -> &CommonConfig {
        &self.common
    }

    fn new_integration(&self) -> Result<Box<dyn Integration>, IntegrationError> {
        Ok(Box::new(crate::new_integration(self)?))
    }

    fn instance_key(&self, _default: &str) -> String {
        // Without an override, identify the integration by the API it talks to.
        self.common
            .instance
            .clone()
            .unwrap_or_else(|| crate::settings::api_host(&self.api_url))
    }
}
