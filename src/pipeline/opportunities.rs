use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::summaries::{self, SummaryData, SummaryRecord};
use crate::db::{StoreError, TabularStore};
use crate::error::AppError;
use crate::llm::{LlmClient, LlmError, StructuredOutput};
use crate::telemetry::metrics::OPPORTUNITIES_EXPANDED;

const MISSING_FIELD: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedOpportunities {
    pub detailed_opportunities: String,
}

impl StructuredOutput for DetailedOpportunities {
    const NAME: &'static str = "DetailedOpportunities";

    fn json_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "detailed_opportunities": {"type": "string"}
            },
            "required": ["detailed_opportunities"],
            "additionalProperties": false
        })
    }
}

fn system_prompt(brand_name: &str) -> String {
    format!(
        "You are an analyst helping {brand_name} find opportunities to differentiate \
        its future loyalty program."
    )
}

fn opportunities_prompt(brand_name: &str, summary: &SummaryData) -> String {
    let market_overview = summary
        .competitive_summary
        .as_deref()
        .unwrap_or(MISSING_FIELD);
    let initial_opportunities = summary
        .gaps_opportunities
        .as_deref()
        .unwrap_or(MISSING_FIELD);

    format!(
        "Based on this competitive analysis for {brand_name}:\n\n\
        Market Overview: {market_overview}\n\
        Initial Opportunities Identified: {initial_opportunities}\n\n\
        Take the existing opportunities identified, conduct additional research if needed \
        and further reinforce the opportunities or existing gaps in the competitive loyalty \
        landscape:\n\
        1. Common gaps and opportunities\n\
        2. Gaps and opportunities unique to the brand or industry\n\n\
        Structure the response in bullet form. Ensure you elaborate on the gaps and \
        opportunities and identify which could provide quick wins and which are \
        longer-term strategic."
    )
}

/// Reads the summary row for `brand_name`; a missing row is `NotFound`.
#[tracing::instrument(
    name = "pipeline_stage get_summary_data",
    skip(store),
    fields(pipeline.stage = "get_summary_data")
)]
pub async fn get_summary_data(
    store: &dyn TabularStore,
    brand_name: &str,
) -> Result<SummaryData, AppError> {
    summaries::get_summary(store, brand_name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No summary data found for {brand_name}")))
}

#[tracing::instrument(
    name = "pipeline_stage analyze_opportunities",
    skip(llm_client, summary),
    fields(pipeline.stage = "analyze_opportunities", opportunities.length)
)]
pub async fn analyze_opportunities(
    llm_client: &LlmClient,
    model: &str,
    brand_name: &str,
    summary: &SummaryData,
) -> Result<DetailedOpportunities, LlmError> {
    let analysis: DetailedOpportunities = llm_client
        .complete_structured(
            "analyze_opportunities",
            model,
            &system_prompt(brand_name),
            &opportunities_prompt(brand_name, summary),
        )
        .await?;

    tracing::Span::current().record(
        "opportunities.length",
        analysis.detailed_opportunities.len(),
    );

    Ok(analysis)
}

#[tracing::instrument(
    name = "pipeline_stage update_opportunities_analysis",
    skip(store, analysis),
    fields(pipeline.stage = "update_opportunities_analysis")
)]
pub async fn update_opportunities_analysis(
    store: &dyn TabularStore,
    brand_name: &str,
    analysis: &DetailedOpportunities,
) -> Result<SummaryRecord, StoreError> {
    match summaries::set_detailed_opportunities(store, brand_name, &analysis.detailed_opportunities)
        .await
    {
        Ok(record) => {
            OPPORTUNITIES_EXPANDED.add(1, &[]);
            tracing::info!(brand_name, "Successfully updated detailed opportunities");
            Ok(record)
        }
        Err(err) => {
            tracing::error!(brand_name, error = %err, "Error updating analysis");
            Err(err)
        }
    }
}

/// Full OpportunityExpander flow: fetch summary, analyze, write back.
pub async fn expand_opportunities(
    llm_client: &LlmClient,
    store: &dyn TabularStore,
    model: &str,
    brand_name: &str,
) -> Result<DetailedOpportunities, AppError> {
    tracing::info!(brand_name, "Starting opportunities analysis");

    let summary = get_summary_data(store, brand_name).await?;
    tracing::info!(brand_name, "Retrieved existing summary data");

    let analysis = analyze_opportunities(llm_client, model, brand_name, &summary).await?;
    tracing::info!(brand_name, "Created detailed opportunities analysis");

    update_opportunities_analysis(store, brand_name, &analysis).await?;

    Ok(analysis)
}
