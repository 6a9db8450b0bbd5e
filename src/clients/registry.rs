use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use reqwest::Client;
use tracing::{info, warn};

use crate::clients::integration::{IntegrationClient, IntegrationRequest, IntegrationResponse};
use crate::config::Config;
use crate::errors::DeliveryError;

pub const KNOWN_TARGETS: &[&str] = &["servicenow", "helpscout", "goalert"];

/// A resolved downstream client. `Disabled` stands in when required
/// configuration is absent: every operation fails fast with
/// `ConfigurationMissing` instead of the process failing at startup.
pub enum ClientProvider {
    Live(IntegrationClient),
    Disabled { target: String },
}

impl ClientProvider {
    pub async fn execute(
        &self,
        request: &IntegrationRequest,
    ) -> Result<IntegrationResponse, DeliveryError> {
        match self {
            ClientProvider::Live(client) => client.execute(request).await,
            ClientProvider::Disabled { target } => Err(DeliveryError::ConfigurationMissing {
                target: target.clone(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, ClientProvider::Live(_))
    }
}

/// Resolves named downstream systems to client handles. Resolution is
/// memoized for the process lifetime; the first call builds the client,
/// later calls return the cached handle. Unknown or unconfigured targets
/// resolve to a disabled handle with a one-time warning.
pub struct IntegrationRegistry {
    config: Config,
    http_client: Client,
    clients: Mutex<HashMap<String, Arc<ClientProvider>>>,
}

impl IntegrationRegistry {
    pub fn new(config: Config, http_client: Client) -> Self {
        Self {
            config,
            http_client,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, target: &str) -> Arc<ClientProvider> {
        let mut clients = self.clients.lock().unwrap();
        if let Some(handle) = clients.get(target) {
            return Arc::clone(handle);
        }

        // Construction happens under the lock so double resolution cannot
        // create duplicate clients.
        let handle = Arc::new(self.build(target));
        clients.insert(target.to_string(), Arc::clone(&handle));
        handle
    }

    fn build(&self, target: &str) -> ClientProvider {
        let credentials = match target {
            "servicenow" => self
                .config
                .servicenow_base_url
                .clone()
                .zip(self.config.servicenow_token.clone()),
            "helpscout" => self
                .config
                .helpscout_base_url
                .clone()
                .zip(self.config.helpscout_api_key.clone()),
            "goalert" => self
                .config
                .goalert_base_url
                .clone()
                .zip(self.config.goalert_token.clone()),
            _ => None,
        };

        match credentials {
            Some((base_url, token)) => {
                info!(target, "integration client initialized");
                ClientProvider::Live(IntegrationClient::new(
                    target.to_string(),
                    self.http_client.clone(),
                    base_url,
                    token,
                ))
            }
            None => {
                warn!(target, "integration disabled: configuration missing");
                ClientProvider::Disabled {
                    target: target.to_string(),
                }
            }
        }
    }

    /// Enablement of every known target, for the health endpoint.
    pub fn status(&self) -> HashMap<String, bool> {
        KNOWN_TARGETS
            .iter()
            .map(|target| (target.to_string(), self.resolve(target).is_enabled()))
            .collect()
    }
}
