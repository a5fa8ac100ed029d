pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod telemetry;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use config::Config;

use config::{ConfigError, Credentials};
use db::{StoreError, SupabaseStore, TabularStore};
use error::AppResult;
use llm::LlmClient;

/// The two remote collaborators every request handler talks to.
#[derive(Clone)]
pub struct Backends {
    pub llm: Arc<LlmClient>,
    pub store: Arc<dyn TabularStore>,
}

impl Backends {
    pub fn connect(config: &Config, credentials: &Credentials) -> Result<Self, StoreError> {
        let provider = llm::openai::OpenAIProvider::for_provider(
            &config.llm_provider,
            &credentials.openai_api_key,
            &config.ollama_base_url,
        );
        let store = SupabaseStore::new(&credentials.supabase_url, &credentials.supabase_key)?;

        Ok(Self {
            llm: Arc::new(LlmClient::new(Arc::new(provider))),
            store: Arc::new(store),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    backends: Result<Backends, ConfigError>,
}

impl AppState {
    /// `backends` is the outcome of the one-time credential check; a failure
    /// is kept and returned by every handler that needs the backends.
    pub fn new(config: Config, backends: Result<Backends, ConfigError>) -> Self {
        Self {
            config: Arc::new(config),
            backends,
        }
    }

    pub fn backends(&self) -> AppResult<&Backends> {
        self.backends.as_ref().map_err(|e| e.clone().into())
    }
}
