use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;

use super::store::{Filter, Row, StoreError, TabularStore};

const PREFER_REPRESENTATION: &str = "return=representation";

/// `TabularStore` over Supabase's PostgREST endpoint (`{url}/rest/v1`).
pub struct SupabaseStore {
    client: Client,
    headers: HeaderMap,
    rest_url: String,
}

#[derive(Deserialize)]
struct PostgrestError {
    message: String,
}

impl SupabaseStore {
    pub fn new(url: &str, key: &str) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(key)?);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder().build()?;

        tracing::info!("Supabase client created");

        Ok(Self {
            client,
            headers,
            rest_url: rest_url(url),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .headers(self.headers.clone())
    }

    /// `GET /{table}?select=a,b&col=eq.v&limit=1`
    fn select_one_request(&self, table: &str, columns: &[&str], filter: &Filter) -> RequestBuilder {
        let (column, condition) = filter_query(filter);
        self.request(Method::GET, table).query(&[
            ("select".to_string(), columns.join(",")),
            (column, condition),
            ("limit".to_string(), "1".to_string()),
        ])
    }

    fn insert_request(&self, table: &str, row: &Row) -> RequestBuilder {
        self.request(Method::POST, table)
            .header("Prefer", PREFER_REPRESENTATION)
            .json(row)
    }

    /// `PATCH /{table}?col=eq.v`
    fn update_request(&self, table: &str, patch: &Row, filter: &Filter) -> RequestBuilder {
        self.request(Method::PATCH, table)
            .query(&[filter_query(filter)])
            .header("Prefer", PREFER_REPRESENTATION)
            .json(patch)
    }

    async fn rows(request: RequestBuilder) -> Result<Vec<Row>, StoreError> {
        let response = request.send().await?;
        let body = checked_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn rest_url(url: &str) -> String {
    format!("{}/rest/v1", url.trim_end_matches('/'))
}

/// PostgREST query pairs for an equality filter, e.g. `brand_name=eq.Acme`.
fn filter_query(filter: &Filter) -> (String, String) {
    (filter.column.clone(), format!("eq.{}", filter.value))
}

async fn checked_body(response: Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    Err(api_error(status.as_u16(), &body))
}

fn api_error(status: u16, body: &str) -> StoreError {
    let message = serde_json::from_str::<PostgrestError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string());
    StoreError::Api { status, message }
}

#[async_trait::async_trait]
impl TabularStore for SupabaseStore {
    #[tracing::instrument(name = "db.select_one", skip(self, columns), fields(db.table = table))]
    async fn select_one(
        &self,
        table: &str,
        columns: &[&str],
        filter: &Filter,
    ) -> Result<Option<Row>, StoreError> {
        let rows = Self::rows(self.select_one_request(table, columns, filter)).await?;
        Ok(rows.into_iter().next())
    }

    #[tracing::instrument(name = "db.insert", skip(self, row), fields(db.table = table))]
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let rows = Self::rows(self.insert_request(table, &row)).await?;
        rows.into_iter().next().ok_or_else(|| StoreError::NoRows {
            table: table.to_string(),
        })
    }

    #[tracing::instrument(name = "db.update", skip(self, patch), fields(db.table = table))]
    async fn update(&self, table: &str, patch: Row, filter: &Filter) -> Result<Row, StoreError> {
        let rows = Self::rows(self.update_request(table, &patch, filter)).await?;
        rows.into_iter().next().ok_or_else(|| StoreError::NoRows {
            table: table.to_string(),
        })
    }
}
