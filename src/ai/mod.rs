//! Content-generation services
//!
//! Defines the vendor-neutral [`ContentGenerator`] contract and the backends
//! implementing it: an OpenAI-compatible chat-completions adapter and an
//! in-memory mock for host-application tests.

pub mod genai;
pub mod mock;
pub mod openai;

pub use genai::{
    Content, CountTokensParameters, CountTokensResponse, EmbedContentParameters,
    EmbedContentResponse, GenerateContentParameters, GenerateContentResponse, Part,
};
pub use mock::MockContentGenerator;
pub use openai::{MalformedEventPolicy, OpenAiContentGenerator, UpstreamStatusPolicy};

use crate::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Lazy, forward-only sequence of envelopes, one per generated text delta.
///
/// Dropping the stream releases the underlying response body.
pub type ResponseStream = BoxStream<'static, Result<GenerateContentResponse>>;

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(
        &self,
        request: GenerateContentParameters,
    ) -> Result<GenerateContentResponse>;

    /// Starts a streamed generation.
    ///
    /// Faults raised before any body is read (sending the request, or an
    /// upstream status under a strict policy) are returned here; faults raised
    /// while reading surface as an `Err` item that ends the stream.
    async fn generate_content_stream(
        &self,
        request: GenerateContentParameters,
    ) -> Result<ResponseStream>;

    async fn count_tokens(&self, request: CountTokensParameters) -> Result<CountTokensResponse>;

    async fn embed_content(&self, request: EmbedContentParameters)
        -> Result<EmbedContentResponse>;
}
