use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::types::{
    CreateIndexRequest, IndexDescription, IndexService, QueryMatch, QueryRequest, Record,
    VectorError,
};
use crate::config::PineconeConfig;

/// REST client for the Pinecone control plane and per-index data planes.
pub struct PineconeClient {
    http: Client,
    api_key: String,
    controller_host: String,
    api_version: String,
    /// index name -> data-plane host, filled by `describe_index`
    hosts: RwLock<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

impl PineconeClient {
    pub fn new(config: &PineconeConfig) -> Self {
        Self::with_http_client(config, Client::new())
    }

    pub fn with_http_client(config: &PineconeConfig, http: Client) -> Self {
        info!(
            "Initializing Pinecone client: controller={}, api_version={}",
            config.controller_host, config.api_version
        );

        Self {
            http,
            api_key: config.api_key.clone(),
            controller_host: config.controller_host.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            hosts: RwLock::new(HashMap::new()),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", &self.api_version)
    }

    /// Turn a non-2xx response into the matching error.
    async fn check(response: Response, index: &str) -> Result<Response, VectorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::NOT_FOUND => VectorError::IndexNotFound(index.to_string()),
            StatusCode::CONFLICT => VectorError::AlreadyExists(index.to_string()),
            _ => VectorError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn cached_host(&self, index: &str) -> Option<String> {
        self.hosts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .cloned()
    }

    fn remember_host(&self, index: &IndexDescription) {
        if index.host.is_empty() {
            return;
        }
        self.hosts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(index.name.clone(), index.host.clone());
    }

    fn forget_host(&self, index: &str) {
        self.hosts
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(index);
    }

    /// Base URL of an index's data plane.
    async fn data_plane_url(&self, index: &str) -> Result<String, VectorError> {
        let host = match self.cached_host(index) {
            Some(host) => host,
            None => {
                let description = self.describe_index(index).await?;
                if description.host.is_empty() {
                    return Err(VectorError::InvalidRequest(format!(
                        "Index '{}' has no data-plane host yet",
                        index
                    )));
                }
                description.host
            }
        };

        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            Ok(host.to_string())
        } else {
            Ok(format!("https://{}", host))
        }
    }
}

#[async_trait]
impl IndexService for PineconeClient {
    async fn list_indexes(&self) -> Result<Vec<IndexDescription>, VectorError> {
        let url = format!("{}/indexes", self.controller_host);
        let response = self.request(Method::GET, &url).send().await?;
        let list: IndexList = Self::check(response, "").await?.json().await?;

        debug!("Listed {} indexes", list.indexes.len());
        Ok(list.indexes)
    }

    async fn create_index(
        &self,
        request: CreateIndexRequest,
    ) -> Result<IndexDescription, VectorError> {
        info!(
            "Creating index '{}' (dimension={}, metric={:?})",
            request.name, request.dimension, request.metric
        );

        let url = format!("{}/indexes", self.controller_host);
        let response = self
            .request(Method::POST, &url)
            .json(&request)
            .send()
            .await?;
        let index: IndexDescription = Self::check(response, &request.name).await?.json().await?;

        self.remember_host(&index);
        Ok(index)
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, VectorError> {
        let url = format!("{}/indexes/{}", self.controller_host, name);
        let response = self.request(Method::GET, &url).send().await?;
        let index: IndexDescription = Self::check(response, name).await?.json().await?;

        self.remember_host(&index);
        Ok(index)
    }

    async fn delete_index(&self, name: &str) -> Result<(), VectorError> {
        info!("Deleting index: {}", name);

        let url = format!("{}/indexes/{}", self.controller_host, name);
        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check(response, name).await?;

        self.forget_host(name);
        info!("Successfully deleted index: {}", name);
        Ok(())
    }

    async fn upsert(
        &self,
        index: &str,
        records: Vec<Record>,
        namespace: Option<&str>,
    ) -> Result<usize, VectorError> {
        if records.is_empty() {
            debug!("No records to upsert into index: {}", index);
            return Ok(0);
        }

        let url = format!("{}/vectors/upsert", self.data_plane_url(index).await?);
        let mut body = json!({ "vectors": records });
        if let Some(namespace) = namespace {
            body["namespace"] = json!(namespace);
        }

        let response = self.request(Method::POST, &url).json(&body).send().await?;
        let result: UpsertResponse = Self::check(response, index).await?.json().await?;

        debug!(
            "Upserted {} records into index: {}",
            result.upserted_count, index
        );
        Ok(result.upserted_count)
    }

    async fn query(
        &self,
        index: &str,
        request: QueryRequest,
    ) -> Result<Vec<QueryMatch>, VectorError> {
        debug!("Querying index '{}' with top_k={}", index, request.top_k);

        let url = format!("{}/query", self.data_plane_url(index).await?);
        let response = self
            .request(Method::POST, &url)
            .json(&request)
            .send()
            .await?;
        let result: QueryResponse = Self::check(response, index).await?.json().await?;

        debug!(
            "Query returned {} matches from index: {}",
            result.matches.len(),
            index
        );
        Ok(result.matches)
    }

    async fn delete_vectors(
        &self,
        index: &str,
        ids: Vec<String>,
        namespace: Option<&str>,
    ) -> Result<(), VectorError> {
        if ids.is_empty() {
            return Ok(());
        }

        let url = format!("{}/vectors/delete", self.data_plane_url(index).await?);
        let mut body = json!({ "ids": ids });
        if let Some(namespace) = namespace {
            body["namespace"] = json!(namespace);
        }

        let response = self.request(Method::POST, &url).json(&body).send().await?;
        Self::check(response, index).await?;

        debug!("Deleted vectors from index: {}", index);
        Ok(())
    }
}
