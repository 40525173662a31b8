use super::genai::{
    CountTokensParameters, CountTokensResponse, EmbedContentParameters, EmbedContentResponse,
    GenerateContentParameters, GenerateContentResponse,
};
use super::{ContentGenerator, ResponseStream};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory [`ContentGenerator`] for exercising host code without a backend.
///
/// Canned texts are served in order and cycle once exhausted. Streamed calls
/// serve canned delta lists the same way, falling back to the next canned
/// text as a single delta.
pub struct MockContentGenerator {
    text_responses: Arc<Mutex<Vec<String>>>,
    stream_responses: Arc<Mutex<Vec<Vec<String>>>>,
    embedding_response: Arc<Mutex<Option<serde_json::Value>>>,
    call_count: Arc<Mutex<usize>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockContentGenerator {
    pub fn new() -> Self {
        Self {
            text_responses: Arc::new(Mutex::new(Vec::new())),
            stream_responses: Arc::new(Mutex::new(Vec::new())),
            embedding_response: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_text_response(self, response: impl Into<String>) -> Self {
        lock(&self.text_responses).push(response.into());
        self
    }

    pub fn with_stream_response<I, S>(self, deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.stream_responses).push(deltas.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_embedding_response(self, response: serde_json::Value) -> Self {
        *lock(&self.embedding_response) = Some(response);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    fn next_call(&self) -> usize {
        let mut count = lock(&self.call_count);
        *count += 1;
        *count
    }

    fn next_text(&self, call: usize, request: &GenerateContentParameters) -> String {
        let responses = lock(&self.text_responses);
        if responses.is_empty() {
            let prompt = request
                .contents
                .last()
                .map(|content| content.text())
                .unwrap_or_default();
            format!("Mock response to: {}", prompt)
        } else {
            responses[(call - 1) % responses.len()].clone()
        }
    }
}

impl Default for MockContentGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for MockContentGenerator {
    async fn generate_content(
        &self,
        request: GenerateContentParameters,
    ) -> Result<GenerateContentResponse> {
        let call = self.next_call();
        Ok(GenerateContentResponse::from_text(
            self.next_text(call, &request),
        ))
    }

    async fn generate_content_stream(
        &self,
        request: GenerateContentParameters,
    ) -> Result<ResponseStream> {
        let call = self.next_call();
        let deltas = {
            let responses = lock(&self.stream_responses);
            if responses.is_empty() {
                None
            } else {
                Some(responses[(call - 1) % responses.len()].clone())
            }
        };
        let deltas = deltas.unwrap_or_else(|| vec![self.next_text(call, &request)]);

        Ok(Box::pin(futures_util::stream::iter(
            deltas
                .into_iter()
                .map(|delta| Ok::<_, Error>(GenerateContentResponse::from_text(delta))),
        )))
    }

    async fn count_tokens(&self, _request: CountTokensParameters) -> Result<CountTokensResponse> {
        self.next_call();
        Ok(CountTokensResponse { total_tokens: 0 })
    }

    async fn embed_content(
        &self,
        _request: EmbedContentParameters,
    ) -> Result<EmbedContentResponse> {
        self.next_call();
        let body = lock(&self.embedding_response)
            .clone()
            .unwrap_or_else(|| serde_json::json!({ "data": [] }));
        Ok(EmbedContentResponse(body))
    }
}
