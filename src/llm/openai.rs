use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, ResponseFormat,
        ResponseFormatJsonSchema,
    },
};

use super::{GenerateRequest, GenerateResponse, OutputFormat, Provider};

pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
}

impl OpenAIProvider {
    pub fn new(api_key: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            provider_name: "openai".to_string(),
        }
    }

    pub fn new_google(api_key: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base("https://generativelanguage.googleapis.com/v1beta/openai");
        Self {
            client: Client::with_config(config),
            provider_name: "google".to_string(),
        }
    }

    pub fn new_ollama(base_url: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key("ollama")
            .with_api_base(format!("{base_url}/v1"));
        Self {
            client: Client::with_config(config),
            provider_name: "ollama".to_string(),
        }
    }

    /// Picks the OpenAI-compatible endpoint named by `LLM_PROVIDER`.
    pub fn for_provider(provider: &str, api_key: &str, ollama_base_url: &str) -> Self {
        match provider {
            "google" => Self::new_google(api_key),
            "ollama" => Self::new_ollama(ollama_base_url),
            _ => Self::new(api_key),
        }
    }
}

fn response_format(format: &OutputFormat) -> Option<ResponseFormat> {
    match format {
        OutputFormat::Text => None,
        OutputFormat::JsonSchema { name, schema } => Some(ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: name.clone(),
                schema: Some(schema.clone()),
                strict: Some(true),
            },
        }),
    }
}

#[async_trait::async_trait]
impl Provider for OpenAIProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(req.system.clone()),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(req.prompt.clone()),
                name: None,
            }),
        ];

        #[allow(deprecated)]
        let request = CreateChatCompletionRequest {
            model: req.model.clone(),
            messages,
            response_format: response_format(&req.format),
            ..Default::default()
        };

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone());

        let finish_reason = response
            .choices
            .first()
            .and_then(|c| c.finish_reason)
            .map(|r| format!("{r:?}").to_lowercase())
            .unwrap_or_default();

        let (input_tokens, output_tokens) = match &response.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (0, 0),
        };

        Ok(GenerateResponse {
            content,
            model: response.model,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }

    fn name(&self) -> &str {
        &self.provider_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_format_sets_no_response_format() {
        assert!(response_format(&OutputFormat::Text).is_none());
    }

    #[test]
    fn test_json_schema_format_is_strict() {
        let format = OutputFormat::JsonSchema {
            name: "detailed_opportunities".to_string(),
            schema: json!({"type": "object"}),
        };
        match response_format(&format) {
            Some(ResponseFormat::JsonSchema { json_schema }) => {
                assert_eq!(json_schema.name, "detailed_opportunities");
                assert_eq!(json_schema.strict, Some(true));
                assert_eq!(json_schema.schema, Some(json!({"type": "object"})));
            }
            other => panic!("unexpected response format: {other:?}"),
        }
    }

    #[test]
    fn test_provider_selection() {
        assert_eq!(OpenAIProvider::for_provider("openai", "k", "").name(), "openai");
        assert_eq!(OpenAIProvider::for_provider("google", "k", "").name(), "google");
        assert_eq!(
            OpenAIProvider::for_provider("ollama", "", "http://localhost:11434").name(),
            "ollama"
        );
        assert_eq!(OpenAIProvider::for_provider("unknown", "k", "").name(), "openai");
    }
}
