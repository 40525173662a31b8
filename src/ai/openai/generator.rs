//! [`ContentGenerator`] backed by an OpenAI-compatible chat-completions API.

use super::client::{
    OpenAiHttpClient, UpstreamStatusPolicy, CHAT_COMPLETIONS_PATH, EMBEDDINGS_PATH,
};
use super::messages::contents_to_messages;
use super::stream::{decode_event_stream, MalformedEventPolicy};
use super::types::{
    decode_lenient, ChatCompletionRequest, ChatCompletionResponse, EmbeddingsRequest,
};
use crate::ai::genai::{
    CountTokensParameters, CountTokensResponse, EmbedContentParameters, EmbedContentResponse,
    GenerateContentParameters, GenerateContentResponse,
};
use crate::ai::{ContentGenerator, ResponseStream};
use crate::config::Config;
use crate::Result;
use async_trait::async_trait;
use reqwest::StatusCode;

/// Adapter from the vendor-neutral generation contract onto
/// `{base_url}/chat/completions` and `{base_url}/embeddings`.
///
/// Holds only immutable configuration; concurrent calls share nothing.
#[derive(Debug, Clone)]
pub struct OpenAiContentGenerator {
    http: OpenAiHttpClient,
    malformed_events: MalformedEventPolicy,
}

impl OpenAiContentGenerator {
    pub fn new(config: Config) -> Self {
        Self::from_http(OpenAiHttpClient::new(config))
    }

    /// Uses a caller-built client, e.g. one with timeouts or a proxy.
    pub fn with_client(config: Config, client: reqwest::Client) -> Self {
        Self::from_http(OpenAiHttpClient::new_with_client(config, client))
    }

    fn from_http(http: OpenAiHttpClient) -> Self {
        Self {
            http,
            malformed_events: MalformedEventPolicy::default(),
        }
    }

    pub fn with_malformed_event_policy(mut self, policy: MalformedEventPolicy) -> Self {
        self.malformed_events = policy;
        self
    }

    /// Non-2xx responses are read like any other by default; `Strict` turns
    /// them into [`crate::Error::Upstream`].
    pub fn with_upstream_status_policy(mut self, policy: UpstreamStatusPolicy) -> Self {
        self.http = self.http.with_status_policy(policy);
        self
    }

    pub fn config(&self) -> &Config {
        self.http.config()
    }

    fn chat_request(
        &self,
        request: &GenerateContentParameters,
        stream: bool,
    ) -> ChatCompletionRequest {
        let model = self.config().model();
        if let Some(requested) = request.model.as_deref() {
            if requested != model {
                tracing::debug!(
                    "Ignoring requested model '{}', using configured model '{}'",
                    requested,
                    model
                );
            }
        }

        let messages = contents_to_messages(&request.contents);
        tracing::debug!(
            "Mapped {} content blocks to {} chat messages",
            request.contents.len(),
            messages.len()
        );

        ChatCompletionRequest {
            model: model.to_string(),
            messages,
            stream: stream.then_some(true),
        }
    }
}

#[async_trait]
impl ContentGenerator for OpenAiContentGenerator {
    async fn generate_content(
        &self,
        request: GenerateContentParameters,
    ) -> Result<GenerateContentResponse> {
        let body = self
            .http
            .post_json(CHAT_COMPLETIONS_PATH, &self.chat_request(&request, false))
            .await?;

        let completion: ChatCompletionResponse = decode_lenient(body);
        Ok(GenerateContentResponse::from_text(completion.first_content()))
    }

    async fn generate_content_stream(
        &self,
        request: GenerateContentParameters,
    ) -> Result<ResponseStream> {
        let response = self
            .http
            .post_stream(CHAT_COMPLETIONS_PATH, &self.chat_request(&request, true))
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            tracing::debug!("Streamed response has no body, yielding nothing");
            return Ok(Box::pin(futures_util::stream::empty::<
                Result<GenerateContentResponse>,
            >()));
        }

        Ok(decode_event_stream(
            response.bytes_stream(),
            self.malformed_events,
        ))
    }

    async fn count_tokens(&self, _request: CountTokensParameters) -> Result<CountTokensResponse> {
        Ok(CountTokensResponse { total_tokens: 0 })
    }

    async fn embed_content(
        &self,
        request: EmbedContentParameters,
    ) -> Result<EmbedContentResponse> {
        let embeddings = EmbeddingsRequest {
            model: self.config().model().to_string(),
            input: request.content,
        };

        let body = self.http.post_json(EMBEDDINGS_PATH, &embeddings).await?;
        Ok(EmbedContentResponse(body))
    }
}
