pub mod competitors;
pub mod health;
pub mod opportunities;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn competitor_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/analyze-competitors", post(competitors::analyze))
        .with_state(state)
}

pub fn opportunity_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root))
        .route("/opportunities/{brand_name}", post(opportunities::expand))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header::CONTENT_TYPE},
        response::Response,
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ConfigError;
    use crate::db::{competitors::TABLE as COMPETITORS, summaries::TABLE as SUMMARIES};
    use crate::testing::{FakeProvider, MemoryStore, test_config, test_state};

    async fn response_json(response: Response) -> Result<Value> {
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn unconfigured_state() -> AppState {
        AppState::new(
            test_config(),
            Err(ConfigError::MissingCredentials(vec![
                "OPENAI_API_KEY",
                "SUPABASE_URL",
                "SUPABASE_KEY",
            ])),
        )
    }

    fn analyze_request(brand_name: &str) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method(Method::POST)
            .uri("/analyze-competitors")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "brand_name": brand_name }).to_string()))?)
    }

    fn expand_request(brand_name: &str) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method(Method::POST)
            .uri(format!("/opportunities/{brand_name}"))
            .body(Body::empty())?)
    }

    fn summary_store() -> MemoryStore {
        MemoryStore::new().with_row(
            SUMMARIES,
            json!({
                "brand_name": "Acme",
                "competitive_summary": "S",
                "gaps_opportunities": "G",
                "detailed_opportunities": null
            }),
        )
    }

    #[tokio::test]
    async fn root_reports_running_without_configuration() -> Result<()> {
        for app in [
            competitor_router(unconfigured_state()),
            opportunity_router(unconfigured_state()),
        ] {
            let response = app
                .oneshot(Request::builder().uri("/").body(Body::empty())?)
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response_json(response).await?,
                json!({ "status": "API is running" })
            );
        }
        Ok(())
    }

    #[tokio::test]
    async fn analyze_competitors_returns_and_stores_names() -> Result<()> {
        let provider = Arc::new(FakeProvider::replying(["A, B,C ,D,E"]));
        let store = Arc::new(MemoryStore::new());
        let app = competitor_router(test_state(provider, store.clone()));

        let response = app.oneshot(analyze_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response_json(response).await?,
            json!({
                "brand_name": "Acme",
                "competitors": ["A", "B", "C", "D", "E"],
                "status": "success"
            })
        );
        let stored: Vec<Value> = store
            .rows(COMPETITORS)
            .into_iter()
            .map(|row| row["competitor_name"].clone())
            .collect();
        assert_eq!(stored, vec!["A", "B", "C", "D", "E"]);
        Ok(())
    }

    #[tokio::test]
    async fn analyze_competitors_model_failure_is_500_with_message() -> Result<()> {
        let provider = Arc::new(FakeProvider::failing("Rate limit reached for gpt-4o"));
        let store = Arc::new(MemoryStore::new());
        let app = competitor_router(test_state(provider, store.clone()));

        let response = app.oneshot(analyze_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await?;
        assert_eq!(body["detail"], "Rate limit reached for gpt-4o");
        assert!(store.rows(COMPETITORS).is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn analyze_competitors_store_failure_is_500() -> Result<()> {
        let provider = Arc::new(FakeProvider::replying(["A, B, C"]));
        let store = Arc::new(MemoryStore::failing_insert_at(1));
        let app = competitor_router(test_state(provider, store.clone()));

        let response = app.oneshot(analyze_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await?;
        assert_eq!(body["detail"], "store returned 503: insert rejected");
        assert_eq!(store.rows(COMPETITORS).len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn analyze_competitors_without_credentials_is_500() -> Result<()> {
        let app = competitor_router(unconfigured_state());

        let response = app.oneshot(analyze_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await?;
        assert_eq!(
            body["detail"],
            "Missing required environment variables: OPENAI_API_KEY, SUPABASE_URL, SUPABASE_KEY"
        );
        Ok(())
    }

    #[tokio::test]
    async fn opportunities_for_unknown_brand_is_404() -> Result<()> {
        let provider = Arc::new(FakeProvider::replying(["unused"]));
        let app = opportunity_router(test_state(provider, Arc::new(MemoryStore::new())));

        let response = app.oneshot(expand_request("Ghost")?).await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response_json(response).await?;
        assert_eq!(body["detail"], "No summary data found for Ghost");
        Ok(())
    }

    #[tokio::test]
    async fn opportunities_success_updates_row_and_echoes_text() -> Result<()> {
        let provider = Arc::new(FakeProvider::replying([
            r#"{"detailed_opportunities": "- Quick win: birthday rewards"}"#,
        ]));
        let store = Arc::new(summary_store());
        let app = opportunity_router(test_state(provider, store.clone()));

        let response = app.oneshot(expand_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response_json(response).await?,
            json!({
                "brand_name": "Acme",
                "detailed_opportunities": "- Quick win: birthday rewards"
            })
        );
        assert_eq!(
            store.rows(SUMMARIES)[0]["detailed_opportunities"],
            "- Quick win: birthday rewards"
        );
        Ok(())
    }

    #[tokio::test]
    async fn opportunities_model_failure_is_500_with_message() -> Result<()> {
        let provider = Arc::new(FakeProvider::failing("upstream connect error"));
        let store = Arc::new(summary_store());
        let app = opportunity_router(test_state(provider, store.clone()));

        let response = app.oneshot(expand_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await?;
        assert_eq!(body["detail"], "upstream connect error");
        assert!(store.rows(SUMMARIES)[0]["detailed_opportunities"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn opportunities_update_failure_is_500_with_store_message() -> Result<()> {
        let provider = Arc::new(FakeProvider::replying([
            r#"{"detailed_opportunities": "- Quick win: app"}"#,
        ]));
        let store = Arc::new(summary_store().failing_updates("permission denied for table"));
        let app = opportunity_router(test_state(provider, store.clone()));

        let response = app.oneshot(expand_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await?;
        assert_eq!(body["detail"], "store returned 503: permission denied for table");
        assert_eq!(body["status"], 500);
        assert!(store.rows(SUMMARIES)[0]["detailed_opportunities"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn opportunities_malformed_model_output_is_500() -> Result<()> {
        let provider = Arc::new(FakeProvider::replying(["not json at all"]));
        let app = opportunity_router(test_state(provider, Arc::new(summary_store())));

        let response = app.oneshot(expand_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await?;
        let detail = body["detail"].as_str().unwrap_or_default();
        assert!(detail.starts_with("model output does not match the DetailedOpportunities schema"));
        Ok(())
    }

    #[tokio::test]
    async fn opportunities_without_credentials_is_500() -> Result<()> {
        let app = opportunity_router(unconfigured_state());

        let response = app.oneshot(expand_request("Acme")?).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }
}
