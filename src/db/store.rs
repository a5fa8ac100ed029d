use serde_json::{Map, Value};
use thiserror::Error;

/// A single row as returned by the store: column name to JSON value.
pub type Row = Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid store key: {0}")]
    InvalidKey(#[from] reqwest::header::InvalidHeaderValue),

    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("store returned malformed rows: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no rows in {table} matched the update filter")]
    NoRows { table: String },
}

/// Exact-match equality filter, the only kind this system issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        row.get(&self.column).and_then(Value::as_str) == Some(self.value.as_str())
    }
}

#[async_trait::async_trait]
pub trait TabularStore: Send + Sync {
    async fn select_one(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Filter,
    ) -> Result<Option<Row>, StoreError>;

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    async fn update(&self, table: &str, patch: Row, filter: &Filter) -> Result<Row, StoreError>;
}
