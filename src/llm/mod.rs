pub mod client;
pub mod openai;

pub use client::{LlmClient, LlmError, StructuredOutput};

/// How the provider should shape the completion.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Text,
    JsonSchema {
        name: String,
        schema: serde_json::Value,
    },
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub format: OutputFormat,
    pub operation: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    pub content: Option<String>,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
    fn name(&self) -> &str;
}
