//! Elasticsearch HTTP client

use crate::search::document::Document;
use crate::search::engine::{BulkResponse, SearchEngine, SearchResponse};
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::SearchRequest;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for an Elasticsearch cluster
#[derive(Debug, Clone)]
pub struct ElasticSettings {
    /// Base url, e.g. `http://localhost:9200`
    pub url: String,

    /// Index holding every content type
    pub index: String,

    pub username: Option<String>,

    pub password: Option<String>,

    pub timeout_secs: u64,
}

impl ElasticSettings {
    pub fn new(url: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            index: index.into(),
            username: None,
            password: None,
            timeout_secs: 30,
        }
    }
}

/// `SearchEngine` backed by the Elasticsearch REST API.
///
/// The inner `reqwest::Client` pools connections and is cheap to clone.
#[derive(Clone)]
pub struct ElasticClient {
    client: Client,
    settings: ElasticSettings,
}

impl ElasticClient {
    pub fn new(settings: ElasticSettings) -> SearchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("forum-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SearchError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(url = %settings.url, index = %settings.index, "Elasticsearch client created");

        Ok(Self { client, settings })
    }

    pub fn index(&self) -> &str {
        &self.settings.index
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}{}",
            self.settings.url.trim_end_matches('/'),
            self.settings.index,
            path
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.settings.username {
            Some(username) => request.basic_auth(username, self.settings.password.as_ref()),
            None => request,
        }
    }

    /// Fail on any non-success status, optionally tolerating 404
    async fn check(response: Response, allow_missing: bool) -> SearchResult<Response> {
        let status = response.status();
        if status.is_success() || (allow_missing && status == StatusCode::NOT_FOUND) {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SearchError::EngineStatus {
            status: status.as_u16(),
            body,
        })
    }

    /// Encode documents as `index` action / source line pairs
    pub fn bulk_body(&self, documents: &[Document]) -> SearchResult<String> {
        let mut body = String::new();
        for document in documents {
            let action = json!({ "index": { "_index": self.settings.index, "_id": document.id } });
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(document)?);
            body.push('\n');
        }
        Ok(body)
    }
}

#[async_trait]
impl SearchEngine for ElasticClient {
    async fn bulk_upsert(&self, documents: &[Document], refresh: bool) -> SearchResult<BulkResponse> {
        let body = self.bulk_body(documents)?;
        let url = format!("{}/_bulk", self.settings.url.trim_end_matches('/'));

        let request = self
            .client
            .post(&url)
            .query(&[("refresh", if refresh { "true" } else { "false" })])
            .header("Content-Type", "application/x-ndjson")
            .body(body);

        let response = self.authorize(request).send().await?;
        let response = Self::check(response, false).await?;
        let bulk: BulkResponse = response.json().await?;

        debug!(
            documents = documents.len(),
            errors = bulk.errors,
            "Bulk request completed"
        );

        Ok(bulk)
    }

    async fn delete_document(&self, id: &str) -> SearchResult<()> {
        let request = self.client.delete(self.url(&format!("/_doc/{}", id)));
        let response = self.authorize(request).send().await?;
        Self::check(response, true).await?;
        debug!(document_id = %id, "Document deleted");
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> SearchResult<SearchResponse> {
        let http = self
            .client
            .post(self.url("/_search"))
            .json(&request.to_json());
        let response = self.authorize(http).send().await?;
        let response = Self::check(response, false).await?;
        Ok(response.json().await?)
    }

    async fn delete_index(&self) -> SearchResult<()> {
        let request = self.client.delete(self.url(""));
        let response = self.authorize(request).send().await?;
        Self::check(response, true).await?;
        info!(index = %self.settings.index, "Index deleted");
        Ok(())
    }

    async fn create_index(&self, settings: Value) -> SearchResult<()> {
        let request = self
            .client
            .put(self.url(""))
            .json(&json!({ "settings": settings }));
        let response = self.authorize(request).send().await?;
        Self::check(response, false).await?;
        info!(index = %self.settings.index, "Index created");
        Ok(())
    }

    async fn put_mapping(&self, mapping: Value) -> SearchResult<()> {
        let request = self.client.put(self.url("/_mapping")).json(&mapping);
        let response = self.authorize(request).send().await?;
        Self::check(response, false).await?;
        info!(index = %self.settings.index, "Mapping updated");
        Ok(())
    }
}
