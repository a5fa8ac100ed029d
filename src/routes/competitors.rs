use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppResult;
use crate::pipeline::analyze_competitors;

#[derive(Debug, Deserialize)]
pub struct AnalyzeCompetitorsBody {
    pub brand_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompetitorsResponse {
    pub brand_name: String,
    pub competitors: Vec<String>,
    pub status: String,
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeCompetitorsBody>,
) -> AppResult<Json<CompetitorsResponse>> {
    let backends = state.backends()?;

    let competitors = analyze_competitors(
        &backends.llm,
        backends.store.as_ref(),
        &state.config.competitor_model,
        &body.brand_name,
    )
    .await?;

    Ok(Json(CompetitorsResponse {
        brand_name: body.brand_name,
        competitors,
        status: "success".to_string(),
    }))
}
