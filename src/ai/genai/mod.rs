pub mod types;

pub use types::{
    Candidate, Content, CountTokensParameters, CountTokensResponse, EmbedContentParameters,
    EmbedContentResponse, FinishReason, GenerateContentParameters, GenerateContentResponse,
    InlineData, Part, PromptFeedback, SafetyRating, MODEL_ROLE, USER_ROLE,
};
