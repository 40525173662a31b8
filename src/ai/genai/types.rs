//! Vendor-neutral content-generation payloads.
//!
//! These mirror the `generateContent` request/response shapes callers already
//! speak, independent of whichever backend serves them.

use serde::{Deserialize, Serialize};

/// Role tag used for blocks produced by the model.
pub const MODEL_ROLE: &str = "model";
/// Role tag used for blocks supplied by the caller.
pub const USER_ROLE: &str = "user";

/// Role-tagged content block used in both requests and responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some(USER_ROLE.to_string()),
            parts: vec![Part::text(text)],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Some(MODEL_ROLE.to_string()),
            parts: vec![Part::text(text)],
        }
    }

    /// Concatenated text of every part, in part order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

/// One part of a content block. Parts without text (inline media) are carried
/// through the schema but never forwarded to a text-only backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }
}

/// Base64 inline payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Request for `generateContent` / `generateContentStream`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentParameters {
    /// Requested model. Backends with a fixed configured model ignore it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub contents: Vec<Content>,
}

impl GenerateContentParameters {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            model: None,
            contents,
        }
    }

    /// Single user turn.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(vec![Content::user(text)])
    }
}

/// Top-level `generateContent` response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Wraps one text fragment into a complete, self-contained envelope.
    ///
    /// The envelope always holds exactly one `model` candidate at index 0 with
    /// finish reason `stop` and no safety ratings. The text is stored as-is,
    /// including the empty string.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Content {
                    role: Some(MODEL_ROLE.to_string()),
                    parts: vec![Part::text(text)],
                },
                index: 0,
                finish_reason: Some(FinishReason::Stop),
                safety_ratings: Vec::new(),
            }],
            prompt_feedback: Some(PromptFeedback::default()),
        }
    }

    /// Text of the first candidate, if there is one.
    pub fn text(&self) -> Option<String> {
        self.candidates
            .first()
            .map(|candidate| candidate.content.text())
    }
}

/// Candidate completion item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Content,
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
}

/// Request for `countTokens`. Contents are accepted but not inspected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountTokensParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    pub total_tokens: u32,
}

/// Request for `embedContent`. `content` is forwarded to the backend verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedContentParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl EmbedContentParameters {
    pub fn new(content: impl Into<serde_json::Value>) -> Self {
        Self {
            model: None,
            content: content.into(),
        }
    }
}

/// Embedding response exactly as the backend returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbedContentResponse(pub serde_json::Value);

impl EmbedContentResponse {
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_json(self) -> serde_json::Value {
        self.0
    }

    /// Vectors found under `data[].embedding`, in `data` order.
    ///
    /// The body is not validated: items without a numeric `embedding` array
    /// are skipped, and a body without `data` yields an empty list.
    pub fn embeddings(&self) -> Vec<Vec<f32>> {
        self.0
            .get("data")
            .and_then(|data| data.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.get("embedding")?.as_array())
                    .map(|values| {
                        values
                            .iter()
                            .filter_map(|v| v.as_f64())
                            .map(|v| v as f32)
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_text_matches_envelope_shape() {
        let response = GenerateContentResponse::from_text("Hello");

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hello" }] },
                    "index": 0,
                    "finishReason": "stop",
                    "safetyRatings": []
                }],
                "promptFeedback": { "safetyRatings": [] }
            })
        );
    }

    #[test]
    fn test_from_text_round_trips_text() {
        for text in ["", "Hello", "  padded  ", "multi\nline", "ünïcødé 🙂"] {
            let response = GenerateContentResponse::from_text(text);
            assert_eq!(response.candidates.len(), 1);
            assert_eq!(response.text().as_deref(), Some(text));
        }
    }

    #[test]
    fn test_text_is_none_without_candidates() {
        assert_eq!(GenerateContentResponse::default().text(), None);
    }

    #[test]
    fn test_parameters_without_contents_deserialize_empty() {
        let params: GenerateContentParameters =
            serde_json::from_value(json!({ "model": "gemini-pro" })).unwrap();
        assert!(params.contents.is_empty());
        assert_eq!(params.model.as_deref(), Some("gemini-pro"));
    }

    #[test]
    fn test_part_deserializes_inline_data() {
        let content: Content = serde_json::from_value(json!({
            "role": "user",
            "parts": [
                { "text": "look" },
                { "inlineData": { "mimeType": "image/png", "data": "AAAA" } }
            ]
        }))
        .unwrap();

        assert_eq!(content.parts.len(), 2);
        assert!(content.parts[1].text.is_none());
        assert_eq!(content.text(), "look");
    }

    #[test]
    fn test_count_tokens_response_serializes_camel_case() {
        let value = serde_json::to_value(CountTokensResponse { total_tokens: 0 }).unwrap();
        assert_eq!(value, json!({ "totalTokens": 0 }));
    }

    #[test]
    fn test_embeddings_reads_openai_shape() {
        let response = EmbedContentResponse(json!({
            "data": [
                { "index": 0, "embedding": [0.5, 0.25] },
                { "index": 1, "embedding": [1.0] }
            ]
        }));
        assert_eq!(response.embeddings(), vec![vec![0.5, 0.25], vec![1.0]]);
    }

    #[test]
    fn test_embeddings_tolerates_unexpected_shape() {
        let response = EmbedContentResponse(json!({ "error": { "message": "nope" } }));
        assert!(response.embeddings().is_empty());
    }
}
