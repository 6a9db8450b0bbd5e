use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::errors::DeliveryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// Uniform request shape for every downstream system. The target-specific
/// wire formats live behind this contract; callers only pick a path and a
/// JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationRequest {
    pub method: RequestMethod,
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
}

impl IntegrationRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: RequestMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: RequestMethod::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationResponse {
    pub status: u16,
    pub body: JsonValue,
}

/// Live HTTP client for one downstream system (ServiceNow, HelpScout,
/// GoAlert, internal stores). Failures are classified per the engine's
/// taxonomy so the retry controller can tell transient from permanent.
pub struct IntegrationClient {
    target: String,
    http_client: Client,
    base_url: String,
    token: String,
}

impl IntegrationClient {
    pub fn new(target: String, http_client: Client, base_url: String, token: String) -> Self {
        Self {
            target,
            http_client,
            base_url,
            token,
        }
    }

    pub async fn execute(
        &self,
        request: &IntegrationRequest,
    ) -> Result<IntegrationResponse, DeliveryError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(target = %self.target, method = ?request.method, %url, "integration call");

        let mut builder = match request.method {
            RequestMethod::Get => self.http_client.get(&url),
            RequestMethod::Post => self.http_client.post(&url),
            RequestMethod::Put => self.http_client.put(&url),
            RequestMethod::Delete => self.http_client.delete(&url),
        };
        builder = builder.bearer_auth(&self.token);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::from_status(status.as_u16(), detail));
        }

        let body = response.json().await.unwrap_or(JsonValue::Null);
        Ok(IntegrationResponse {
            status: status.as_u16(),
            body,
        })
    }
}
