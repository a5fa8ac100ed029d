use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::store::{Filter, Row, StoreError, TabularStore};

pub const TABLE: &str = "competitor_summary";

/// The two columns the opportunity prompt is built from. Either may be null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SummaryData {
    pub competitive_summary: Option<String>,
    pub gaps_opportunities: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub brand_name: String,
    pub competitive_summary: Option<String>,
    pub gaps_opportunities: Option<String>,
    pub detailed_opportunities: Option<String>,
}

pub async fn get_summary(
    store: &dyn TabularStore,
    brand_name: &str,
) -> Result<Option<SummaryData>, StoreError> {
    let row = store
        .select_one(
            TABLE,
            &["competitive_summary", "gaps_opportunities"],
            &Filter::eq("brand_name", brand_name),
        )
        .await?;

    row.map(|row| serde_json::from_value(Value::Object(row)))
        .transpose()
        .map_err(StoreError::from)
}

pub async fn set_detailed_opportunities(
    store: &dyn TabularStore,
    brand_name: &str,
    detailed_opportunities: &str,
) -> Result<SummaryRecord, StoreError> {
    let mut patch = Row::new();
    patch.insert(
        "detailed_opportunities".to_string(),
        json!(detailed_opportunities),
    );

    let row = store
        .update(TABLE, patch, &Filter::eq("brand_name", brand_name))
        .await?;

    Ok(serde_json::from_value(Value::Object(row))?)
}
