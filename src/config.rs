use std::env;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("{var} must be a number, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Per-binary defaults that differ between the two services.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDefaults {
    pub service_name: &'static str,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub llm_provider: String,
    pub ollama_base_url: String,
    pub competitor_model: String,
    pub opportunity_model: String,
    pub openai_api_key: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

/// The three secrets both services need before they can serve a request.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub supabase_url: String,
    pub supabase_key: String,
}

impl Config {
    pub fn from_env(defaults: ServiceDefaults) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(defaults, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(defaults: ServiceDefaults, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("APP_PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "APP_PORT",
                    value,
                })?,
            None => defaults.port,
        };

        Ok(Self {
            port,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            llm_provider: lookup("LLM_PROVIDER").unwrap_or_else(|| "openai".to_string()),
            ollama_base_url: lookup("OLLAMA_BASE_URL")
                .unwrap_or_else(|| "http://localhost:11434".to_string()),
            competitor_model: lookup("COMPETITOR_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            opportunity_model: lookup("OPPORTUNITY_MODEL")
                .unwrap_or_else(|| "gpt-4o-2024-11-20".to_string()),
            openai_api_key: non_empty(lookup("OPENAI_API_KEY")),
            supabase_url: non_empty(lookup("SUPABASE_URL")),
            supabase_key: non_empty(lookup("SUPABASE_KEY")),
            otel_service_name: lookup("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| defaults.service_name.to_string()),
            otel_exporter_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| "http://localhost:4317".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (
            &self.openai_api_key,
            &self.supabase_url,
            &self.supabase_key,
        ) {
            (Some(openai_api_key), Some(supabase_url), Some(supabase_key)) => Ok(Credentials {
                openai_api_key: openai_api_key.clone(),
                supabase_url: supabase_url.clone(),
                supabase_key: supabase_key.clone(),
            }),
            _ => {
                let missing = [
                    ("OPENAI_API_KEY", self.openai_api_key.is_none()),
                    ("SUPABASE_URL", self.supabase_url.is_none()),
                    ("SUPABASE_KEY", self.supabase_key.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(ConfigError::MissingCredentials(missing))
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
