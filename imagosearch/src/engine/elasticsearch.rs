//! Elasticsearch over HTTP

use super::{EngineError, SearchEngine};
use crate::config::ElasticsearchConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use url::Url;

/// Elasticsearch client
///
/// Wraps a pooled [`reqwest::Client`]; cloning is cheap and clones share the
/// connection pool.
#[derive(Clone)]
pub struct ElasticsearchClient {
    client: Client,
    base_url: Url,
    index: String,
    username: Option<String>,
    password: Option<String>,
}

impl std::fmt::Debug for ElasticsearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchClient")
            .field("base_url", &self.base_url.as_str())
            .field("index", &self.index)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchClient {
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, EngineError> {
        let base_url = Url::parse(&config.url())
            .map_err(|e| EngineError::InvalidUrl(format!("{}: {}", config.url(), e)))?;

        if !config.verify_certs {
            tracing::warn!("TLS certificate verification disabled for {}", base_url);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.verify_certs)
            .build()?;

        Ok(Self {
            client,
            base_url,
            index: config.index.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// `<base>/<segments...>` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, EngineError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EngineError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_ref()),
            None => request,
        }
    }
}

#[async_trait]
impl SearchEngine for ElasticsearchClient {
    async fn search(&self, body: &Value) -> Result<Value, EngineError> {
        let url = self.endpoint(&[&self.index, "_search"])?;
        tracing::debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Value>, EngineError> {
        let url = self.endpoint(&[&self.index, "_doc", id])?;
        tracing::debug!("GET {}", url);

        let response = self.authorize(self.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status { status, body });
        }

        let document: Value = response.json().await?;
        // `found: false` comes back with 404 on current versions, but not on all
        if document.get("found").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }
        Ok(Some(document))
    }

    fn index(&self) -> &str {
        &self.index
    }
}
