use axum::Json;
use serde_json::{Value, json};

pub async fn root() -> Json<Value> {
    tracing::info!("Health check endpoint called");
    Json(json!({ "status": "API is running" }))
}
