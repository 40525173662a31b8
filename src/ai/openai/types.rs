//! OpenAI-compatible request/response payloads.
//!
//! Response types default every field so that a well-formed JSON body with an
//! unexpected shape decodes to "no content" rather than an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const ASSISTANT_ROLE: &str = "assistant";
pub const USER_ROLE: &str = "user";

/// Request body for chat completions.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Flat chat message sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Top-level chat completion response.
///
/// Only `choices[0]` is ever decoded, and only the fields read from it are
/// typed; siblings of any shape are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Option<Vec<serde_json::Value>>,
}

impl ChatCompletionResponse {
    /// `choices[0].message.content`, or empty when absent at any level.
    pub fn first_content(self) -> String {
        first_choice::<ChatChoice>(self.choices)
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default()
    }
}

/// Single choice item returned by chat completions.
#[derive(Debug, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatResponseMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One `data:` event of a streamed chat completion.
#[derive(Debug, Default, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Option<Vec<serde_json::Value>>,
}

impl ChatCompletionChunk {
    /// `choices[0].delta.content` when present and non-empty.
    pub fn first_delta(self) -> Option<String> {
        first_choice::<ChunkChoice>(self.choices)?
            .delta?
            .content
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Option<ChunkDelta>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChunkDelta {
    #[serde(default)]
    pub content: Option<String>,
}

fn first_choice<T>(choices: Option<Vec<serde_json::Value>>) -> Option<T>
where
    T: DeserializeOwned + Default,
{
    choices?.into_iter().next().map(decode_lenient)
}

/// Request body for embeddings.
#[derive(Debug, Serialize)]
pub struct EmbeddingsRequest {
    pub model: String,
    pub input: serde_json::Value,
}

/// Decodes an already-parsed JSON value into `T`, falling back to
/// `T::default()` when the value has an unexpected shape.
pub fn decode_lenient<T>(value: serde_json::Value) -> T
where
    T: DeserializeOwned + Default,
{
    serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::debug!("Unexpected response shape, treating as empty: {}", e);
        T::default()
    })
}
