use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{GenerateRequest, GenerateResponse, OutputFormat, Provider};
use crate::telemetry::metrics::{GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE};

#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport, auth or quota failure reported by the provider. Displays the
    /// provider's own message unchanged.
    #[error(transparent)]
    Provider(#[from] anyhow::Error),

    #[error("model {model} returned an empty response")]
    EmptyResponse { model: String },

    #[error("model output does not match the {schema} schema: {source}")]
    Parse {
        schema: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A type the model can be asked to produce through a strict JSON schema.
pub trait StructuredOutput: DeserializeOwned {
    const NAME: &'static str;

    fn json_schema() -> serde_json::Value;
}

pub struct LlmClient {
    provider: Arc<dyn Provider>,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Free-text completion. Rejects a reply with no text in it.
    pub async fn complete_text(
        &self,
        operation: &'static str,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let req = GenerateRequest {
            model: model.to_string(),
            system: system.to_string(),
            prompt: prompt.to_string(),
            format: OutputFormat::Text,
            operation,
        };

        let resp = self.generate_once(&req).await?;
        non_empty_content(resp)
    }

    /// Completion constrained to `T`'s schema and parsed into `T`.
    pub async fn complete_structured<T: StructuredOutput>(
        &self,
        operation: &'static str,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<T, LlmError> {
        let req = GenerateRequest {
            model: model.to_string(),
            system: system.to_string(),
            prompt: prompt.to_string(),
            format: OutputFormat::JsonSchema {
                name: T::NAME.to_string(),
                schema: T::json_schema(),
            },
            operation,
        };

        let resp = self.generate_once(&req).await?;
        let content = non_empty_content(resp)?;
        parse_structured(&content)
    }

    async fn generate_once(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let output_type = match req.format {
            OutputFormat::Text => "text",
            OutputFormat::JsonSchema { .. } => "json",
        };

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            gen_ai.output.type = output_type,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            insights.operation = req.operation,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        {
            let mut user_event_attrs =
                vec![KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000))];
            if !req.system.is_empty() {
                user_event_attrs.push(KeyValue::new(
                    "gen_ai.system_instructions",
                    truncate(&req.system, 500),
                ));
            }
            span.add_event("gen_ai.user.message", user_event_attrs);
        }

        let result = self.provider.generate(req).instrument(span.clone()).await;

        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(resp) => {
                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                if let Some(content) = resp.content.as_deref() {
                    span.add_event(
                        "gen_ai.assistant.message",
                        vec![KeyValue::new("gen_ai.completion", truncate(content, 2000))],
                    );
                }

                let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
                let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name);
                let model_kv = KeyValue::new("gen_ai.request.model", req.model.clone());

                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", classify_error(&err));

                tracing::error!(
                    provider = %provider_name,
                    model = %req.model,
                    error = %err,
                    "LLM call failed"
                );

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        KeyValue::new("gen_ai.provider.name", provider_name),
                        KeyValue::new("gen_ai.request.model", req.model.clone()),
                    ],
                );

                Err(err)
            }
        }
    }
}

fn non_empty_content(resp: GenerateResponse) -> Result<String, LlmError> {
    match resp.content {
        Some(content) if !content.trim().is_empty() => Ok(content),
        _ => Err(LlmError::EmptyResponse { model: resp.model }),
    }
}

/// Parses the raw reply first. Only a reply that is not valid JSON as-is goes
/// through `extract_json`, so fences or braces inside string values survive.
pub(crate) fn parse_structured<T: StructuredOutput>(content: &str) -> Result<T, LlmError> {
    serde_json::from_str(content)
        .or_else(|raw_err| {
            let extracted = extract_json(content);
            if extracted == content {
                return Err(raw_err);
            }
            serde_json::from_str(&extracted)
        })
        .map_err(|source| LlmError::Parse {
            schema: T::NAME,
            source,
        })
}

/// Strips markdown fences or surrounding prose that some OpenAI-compatible
/// backends wrap around schema-constrained output.
pub(crate) fn extract_json(content: &str) -> String {
    if let Some(start) = content.find("```json")
        && let Some(end) = content[start + 7..].find("```")
    {
        return content[start + 7..start + 7 + end].trim().to_string();
    }
    if let Some(start) = content.find("```")
        && let Some(end) = content[start + 3..].find("```")
    {
        let inner = content[start + 3..start + 3 + end].trim();
        if inner.starts_with('{') {
            return inner.to_string();
        }
    }
    if let Some(start) = content.find('{')
        && let Some(end) = content.rfind('}')
        && start < end
    {
        return content[start..=end].to_string();
    }
    content.to_string()
}

fn classify_error(err: &anyhow::Error) -> &'static str {
    let msg = err.to_string().to_lowercase();
    if msg.contains("rate limit") || msg.contains("429") || msg.contains("quota") {
        "rate_limit"
    } else if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
        "timeout"
    } else if msg.contains("401")
        || msg.contains("403")
        || msg.contains("auth")
        || msg.contains("api key")
    {
        "auth_error"
    } else if msg.contains("400") || msg.contains("422") || msg.contains("invalid") {
        "invalid_request"
    } else if msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("server")
    {
        "server_error"
    } else if msg.contains("connect")
        || msg.contains("dns")
        || msg.contains("network")
        || msg.contains("reset")
    {
        "network_error"
    } else {
        "unknown_error"
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, c)| i + c.len_utf8() <= max)
            .map(|(_, c)| c)
            .collect()
    }
}
