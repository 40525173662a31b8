pub mod client;
pub mod generator;
pub mod messages;
pub mod stream;
pub mod types;

pub use client::{OpenAiHttpClient, UpstreamStatusPolicy};
pub use generator::OpenAiContentGenerator;
pub use messages::contents_to_messages;
pub use stream::{decode_event_stream, MalformedEventPolicy};
