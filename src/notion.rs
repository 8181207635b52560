use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::UpstreamError;

pub const DEFAULT_API_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_API_VERSION: &str = "2022-06-28";

/// A Notion database as returned by `GET /databases/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// One row of a database. Property values are left untyped: their names and
/// shapes depend on how the user set up their calendar.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Body of `POST /databases/{id}/query`.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseQuery {
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl DatabaseQuery {
    /// Only rows whose `files` property is populated.
    pub fn with_files(property: &str, page_size: u32) -> Self {
        Self {
            page_size,
            filter: Some(serde_json::json!({
                "property": property,
                "files": { "is_not_empty": true }
            })),
        }
    }
}

/// The slice of the Notion API the widget needs. The credential travels with
/// every call since each widget carries its own integration token.
#[async_trait]
pub trait NotionApi: Send + Sync {
    async fn users_me(&self, token: &str) -> Result<Value, UpstreamError>;

    async fn retrieve_database(
        &self,
        token: &str,
        database_id: &str,
    ) -> Result<Database, UpstreamError>;

    async fn query_database(
        &self,
        token: &str,
        database_id: &str,
        query: &DatabaseQuery,
    ) -> Result<QueryResponse, UpstreamError>;
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// HTTPS client for the public Notion API.
#[derive(Debug, Clone)]
pub struct NotionClient {
    client: Client,
    base_url: String,
    version: String,
}

impl NotionClient {
    pub fn new(base_url: &str, version: &str) -> Result<Self, UpstreamError> {
        let app_name = env!("CARGO_PKG_NAME");
        let app_version = env!("CARGO_PKG_VERSION");
        let client = Client::builder()
            .user_agent(format!("{app_name}/{app_version}"))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            version: version.to_string(),
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        token: &str,
        request: RequestBuilder,
    ) -> Result<T, UpstreamError> {
        let response = request
            .bearer_auth(token)
            .header("Notion-Version", &self.version)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ApiErrorBody = response.json().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                code: body.code,
                message: if body.message.is_empty() {
                    status.to_string()
                } else {
                    body.message
                },
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn users_me(&self, token: &str) -> Result<Value, UpstreamError> {
        let url = format!("{}/users/me", self.base_url);
        self.send(token, self.client.get(url)).await
    }

    async fn retrieve_database(
        &self,
        token: &str,
        database_id: &str,
    ) -> Result<Database, UpstreamError> {
        let url = format!("{}/databases/{database_id}", self.base_url);
        self.send(token, self.client.get(url)).await
    }

    async fn query_database(
        &self,
        token: &str,
        database_id: &str,
        query: &DatabaseQuery,
    ) -> Result<QueryResponse, UpstreamError> {
        let url = format!("{}/databases/{database_id}/query", self.base_url);
        debug!(database_id, page_size = query.page_size, "querying Notion database");
        self.send(token, self.client.post(url).json(query)).await
    }
}
