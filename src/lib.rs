//! Vendor-neutral content generation over OpenAI-compatible APIs
//!
//! Adapts the `generateContent` / `generateContentStream` / `countTokens` /
//! `embedContent` contract onto a chat-completions backend, translating
//! requests into chat messages and streamed deltas back into response
//! envelopes.

pub mod ai;
pub mod config;
pub mod error;

pub use ai::{ContentGenerator, MockContentGenerator, OpenAiContentGenerator, ResponseStream};
pub use config::Config;
pub use error::{Error, Result};
