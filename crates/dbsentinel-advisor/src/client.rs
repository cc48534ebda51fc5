//! Advisory service client.

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

use tracing::debug;

use dbsentinel_config::AiConfig;

use crate::api::{ApiMessage, ApiRequest, ApiResponse};
use crate::error::AdvisorError;

const SYSTEM_PROMPT: &str = "You are an experienced MySQL administrator. \
Give recommendations for resolving and preventing the incident based on \
the provided metrics.";

const MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.3;

/// Client for the incident-diagnosis endpoint.
pub struct AdvisorClient {
    api_key: String,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl AdvisorClient {
    /// Build a client from configuration. The per-request timeout and
    /// the optional SOCKS proxy are baked into the HTTP client here.
    pub fn new(config: &AiConfig) -> Result<Self, AdvisorError> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout());

        if let Some(ref proxy_url) = config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| AdvisorError::Build(format!("invalid proxy url: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| AdvisorError::Build(e.to_string()))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            client,
        })
    }

    /// Ask for a diagnosis of the given incident context.
    pub async fn diagnose(&self, context: &str) -> Result<String, AdvisorError> {
        let request = ApiRequest {
            model: self.model.clone(),
            messages: vec![ApiMessage::system(SYSTEM_PROMPT), ApiMessage::user(context)],
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
        };

        debug!(model = %self.model, "Requesting advisory diagnosis");

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AdvisorError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Api { status, message });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Network(e.to_string()))?;

        api_response.text().ok_or(AdvisorError::EmptyResponse)
    }
}
