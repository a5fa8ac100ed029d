use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::store::{Row, StoreError, TabularStore};

pub const TABLE: &str = "competitors";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorRecord {
    pub brand_name: String,
    pub competitor_name: String,
}

impl CompetitorRecord {
    fn into_row(self) -> Row {
        let mut row = Row::new();
        row.insert("brand_name".to_string(), json!(self.brand_name));
        row.insert("competitor_name".to_string(), json!(self.competitor_name));
        row
    }
}

pub async fn insert_competitor(
    store: &dyn TabularStore,
    brand_name: &str,
    competitor_name: &str,
) -> Result<CompetitorRecord, StoreError> {
    let record = CompetitorRecord {
        brand_name: brand_name.to_string(),
        competitor_name: competitor_name.to_string(),
    };

    let row = store.insert(TABLE, record.into_row()).await?;

    Ok(serde_json::from_value(Value::Object(row))?)
}
