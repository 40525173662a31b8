use crate::config::Config;
use crate::{Error, Result};
use reqwest::{Client, Response};
use serde::Serialize;

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
pub const EMBEDDINGS_PATH: &str = "/embeddings";

/// What to do with a non-2xx upstream response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpstreamStatusPolicy {
    /// Log the status and read the body like any other response. A JSON error
    /// body then decodes to no content.
    #[default]
    Lenient,
    /// Fail with [`Error::Upstream`] before the body is handed on.
    Strict,
}

/// Thin JSON-over-HTTP client for an OpenAI-compatible API.
///
/// Timeouts, TLS and pooling are whatever the supplied [`Client`] does.
#[derive(Debug, Clone)]
pub struct OpenAiHttpClient {
    client: Client,
    config: Config,
    status_policy: UpstreamStatusPolicy,
}

impl OpenAiHttpClient {
    pub fn new(config: Config) -> Self {
        Self::new_with_client(config, Client::new())
    }

    pub fn new_with_client(config: Config, client: Client) -> Self {
        Self {
            client,
            config,
            status_policy: UpstreamStatusPolicy::default(),
        }
    }

    pub fn with_status_policy(mut self, policy: UpstreamStatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sends a POST and returns the response with its body unread.
    async fn send<Req: Serialize + ?Sized>(&self, path: &str, request: &Req) -> Result<Response> {
        let url = format!("{}{}", self.config.base_url(), path);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.api_key())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to {}: {}", url, e);
                e
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match self.status_policy {
            UpstreamStatusPolicy::Lenient => {
                tracing::warn!("Upstream returned status {} for {}", status, url);
                Ok(response)
            }
            UpstreamStatusPolicy::Strict => {
                let body = response.text().await?;
                tracing::error!("Upstream API error (status {}): {}", status, body);
                Err(Error::Upstream {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// POSTs `request` and parses the full response body as JSON.
    pub async fn post_json<Req: Serialize + ?Sized>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<serde_json::Value> {
        let response = self.send(path, request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse upstream response: {}\nBody: {}", e, body);
            Error::Serialization(e)
        })
    }

    /// POSTs `request` and hands back the live response for body streaming.
    pub async fn post_stream<Req: Serialize + ?Sized>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Response> {
        self.send(path, request).await
    }
}
