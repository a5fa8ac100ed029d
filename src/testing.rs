//! In-memory stand-ins for the model provider and the tabular store.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::config::{Config, ServiceDefaults};
use crate::db::{Filter, Row, StoreError, TabularStore};
use crate::llm::{GenerateRequest, GenerateResponse, LlmClient, Provider};
use crate::{AppState, Backends};

enum Reply {
    Content(String),
    Error(String),
}

/// Provider that plays back scripted replies and records every request.
pub struct FakeProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeProvider {
    pub fn replying<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| Reply::Content(r.into()))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Reply::Error(message.to_string())])),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for FakeProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.requests.lock().unwrap().push(req.clone());

        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Content(content)) => Ok(GenerateResponse {
                content: Some(content),
                model: req.model.clone(),
                input_tokens: 10,
                output_tokens: 5,
                finish_reason: "stop".to_string(),
            }),
            Some(Reply::Error(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Tables held in memory. `fail_insert_at` makes the Nth insert (0-based,
/// counted across the store's lifetime) fail; `fail_updates` rejects every
/// update with that message.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Row>>>,
    inserts: Mutex<usize>,
    fail_insert_at: Option<usize>,
    fail_updates: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_insert_at(n: usize) -> Self {
        Self {
            fail_insert_at: Some(n),
            ..Self::default()
        }
    }

    pub fn failing_updates(self, message: &str) -> Self {
        Self {
            fail_updates: Some(message.to_string()),
            ..self
        }
    }

    pub fn with_row(self, table: &str, row: Value) -> Self {
        if let Value::Object(row) = row {
            self.tables
                .lock()
                .unwrap()
                .entry(table.to_string())
                .or_default()
                .push(row);
        }
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl TabularStore for MemoryStore {
    async fn select_one(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Filter,
    ) -> Result<Option<Row>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let found = tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| filter.matches(row)));

        Ok(found.map(|row| {
            columns
                .iter()
                .filter_map(|c| row.get(*c).map(|v| (c.to_string(), v.clone())))
                .collect()
        }))
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let mut inserts = self.inserts.lock().unwrap();
        if self.fail_insert_at == Some(*inserts) {
            return Err(StoreError::Api {
                status: 503,
                message: "insert rejected".to_string(),
            });
        }
        *inserts += 1;

        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, patch: Row, filter: &Filter) -> Result<Row, StoreError> {
        if let Some(message) = &self.fail_updates {
            return Err(StoreError::Api {
                status: 503,
                message: message.clone(),
            });
        }

        let mut tables = self.tables.lock().unwrap();
        let mut updated = None;
        for row in tables.entry(table.to_string()).or_default().iter_mut() {
            if filter.matches(row) {
                row.extend(patch.clone());
                updated.get_or_insert_with(|| row.clone());
            }
        }
        updated.ok_or_else(|| StoreError::NoRows {
            table: table.to_string(),
        })
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(
        ServiceDefaults {
            service_name: "test",
            port: 0,
        },
        |_| None,
    )
    .unwrap()
}

pub fn test_state(provider: Arc<FakeProvider>, store: Arc<MemoryStore>) -> AppState {
    AppState::new(
        test_config(),
        Ok(Backends {
            llm: Arc::new(LlmClient::new(provider)),
            store,
        }),
    )
}
