use opentelemetry::KeyValue;

use crate::db::competitors::{CompetitorRecord, TABLE as COMPETITORS_TABLE, insert_competitor};
use crate::db::{StoreError, TabularStore};
use crate::error::AppError;
use crate::llm::{LlmClient, LlmError};
use crate::telemetry::metrics::{COMPETITORS_FOUND, COMPETITOR_ROWS_INSERTED};

const SYSTEM_PROMPT: &str = "You are a market research analyst who specialises in \
customer loyalty programs. Answer with brand names only.";

fn competitor_prompt(brand_name: &str) -> String {
    format!(
        "List exactly 5 competitor brands of {brand_name} that currently run an active \
        customer loyalty program.\n\
        Return only the 5 brand names on a single line, separated by commas, \
        with no numbering, explanations or other text."
    )
}

/// Splits a comma-separated model reply. Whitespace around each name is
/// trimmed; empty entries are kept and the count is not checked.
pub fn parse_competitor_list(reply: &str) -> Vec<String> {
    reply.split(',').map(|name| name.trim().to_string()).collect()
}

#[tracing::instrument(
    name = "pipeline_stage find_competitors",
    skip(llm_client),
    fields(pipeline.stage = "find_competitors", competitors.count)
)]
pub async fn find_competitors(
    llm_client: &LlmClient,
    model: &str,
    brand_name: &str,
) -> Result<Vec<String>, LlmError> {
    let reply = llm_client
        .complete_text(
            "find_competitors",
            model,
            SYSTEM_PROMPT,
            &competitor_prompt(brand_name),
        )
        .await?;

    let competitors = parse_competitor_list(&reply);

    tracing::Span::current().record("competitors.count", competitors.len());
    COMPETITORS_FOUND.record(competitors.len() as f64, &[]);

    Ok(competitors)
}

/// One insert per competitor, in order. The first failure stops the loop;
/// rows already written stay written.
#[tracing::instrument(
    name = "pipeline_stage persist_competitors",
    skip(store, competitors),
    fields(pipeline.stage = "persist_competitors", competitors.count = competitors.len())
)]
pub async fn persist_competitors(
    store: &dyn TabularStore,
    brand_name: &str,
    competitors: &[String],
) -> Result<Vec<CompetitorRecord>, StoreError> {
    let mut inserted = Vec::with_capacity(competitors.len());

    for competitor in competitors {
        let record = insert_competitor(store, brand_name, competitor).await?;
        COMPETITOR_ROWS_INSERTED.add(1, &[KeyValue::new("db.table", COMPETITORS_TABLE)]);
        inserted.push(record);
    }

    tracing::info!(
        brand_name,
        rows = inserted.len(),
        "Stored competitors"
    );

    Ok(inserted)
}

/// Full CompetitorFinder flow: ask the model, then store every name.
pub async fn analyze_competitors(
    llm_client: &LlmClient,
    store: &dyn TabularStore,
    model: &str,
    brand_name: &str,
) -> Result<Vec<String>, AppError> {
    tracing::info!(brand_name, "Starting competitor analysis");

    let competitors = find_competitors(llm_client, model, brand_name).await?;
    tracing::info!(brand_name, competitors = ?competitors, "Found competitors");

    persist_competitors(store, brand_name, &competitors).await?;

    Ok(competitors)
}
