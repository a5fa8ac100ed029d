use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppResult;
use crate::pipeline::expand_opportunities;

#[derive(Debug, Serialize, Deserialize)]
pub struct OpportunitiesResponse {
    pub brand_name: String,
    pub detailed_opportunities: String,
}

pub async fn expand(
    State(state): State<AppState>,
    Path(brand_name): Path<String>,
) -> AppResult<Json<OpportunitiesResponse>> {
    let backends = state.backends()?;

    let analysis = expand_opportunities(
        &backends.llm,
        backends.store.as_ref(),
        &state.config.opportunity_model,
        &brand_name,
    )
    .await?;

    Ok(Json(OpportunitiesResponse {
        brand_name,
        detailed_opportunities: analysis.detailed_opportunities,
    }))
}
