//! Translation of vendor-neutral content blocks into chat messages.

use super::types::{ChatMessage, ASSISTANT_ROLE, USER_ROLE};
use crate::ai::genai::{Content, MODEL_ROLE};

/// Flattens content blocks into chat messages, preserving block order.
///
/// Each block contributes the concatenation of its non-empty text parts.
/// A block is dropped when that concatenation is empty *or whitespace-only*,
/// which is stricter than a plain emptiness check: `"  "` or `"\n"` sends no
/// message. Kept text is sent verbatim, untrimmed. `model` blocks become
/// `assistant` messages, everything else becomes `user`.
pub fn contents_to_messages(contents: &[Content]) -> Vec<ChatMessage> {
    contents
        .iter()
        .filter_map(|content| {
            let text: String = content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .filter(|text| !text.is_empty())
                .collect();

            if text.trim().is_empty() {
                return None;
            }

            let role = match content.role.as_deref() {
                Some(MODEL_ROLE) => ASSISTANT_ROLE,
                _ => USER_ROLE,
            };

            Some(ChatMessage {
                role: role.to_string(),
                content: text,
            })
        })
        .collect()
}
