use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::ConfigError;
use crate::db::StoreError;
use crate::llm::LlmError;

/// Every variant displays the underlying message unchanged; that text is
/// what the client receives as `detail`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Llm(_) | AppError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        match &self {
            AppError::NotFound(msg) => tracing::warn!(error = %msg, "Value error"),
            AppError::Config(e) => tracing::error!(error = %e, "Configuration error"),
            AppError::Llm(e) => tracing::error!(error = %e, "LLM error"),
            AppError::Store(e) => tracing::error!(error = %e, "Store error"),
        }

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "detail": detail,
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "detail": detail,
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
