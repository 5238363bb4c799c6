//! Recipe generation: prompt construction, the text generation service and
//! the flow that turns a pantry into a saved recipe.

mod flow;
mod gemini;
mod prompt;

pub use flow::{FlowOutcome, FlowState, RecipeFlow};
pub use gemini::{GeminiClient, DEFAULT_MODEL};
pub use prompt::{build_prompt, parse_generated, ParseError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
            response_mime_type: "application/json".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generation API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Generation response contained no text")]
    EmptyResponse,

    #[error("Failed to decode generation response: {0}")]
    Decode(String),
}

/// A text generation backend.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Sends `prompt` and returns the generated text.
    async fn generate(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String, GenerationError>;
}
