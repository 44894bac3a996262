//! Milvus vector store integration for vectorhub.
//!
//! This crate provides [`MilvusVectorStore`], an implementation of the
//! [`VectorStore`](vectorhub_core::VectorStore) trait backed by
//! [Milvus](https://milvus.io/) using its RESTful API v1.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vectorhub_milvus::{MilvusConfig, MilvusVectorStore};
//! use vectorhub_transport::HttpTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MilvusConfig::new("localhost", 19530, "root", "Milvus")
//!     .with_collection("my_collection");
//! let store = MilvusVectorStore::new(config, Arc::new(HttpTransport::new()))?;
//! store.initialize().await?;
//! # Ok(())
//! # }
//! ```

mod protocol;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use vectorhub_core::{
    truncate_results, validate_batch, validate_dimension, validate_query, VectorHubError,
    DEFAULT_DIMENSION,
};
use vectorhub_transport::{HttpRequest, Method, Transport};

use protocol::{
    document_to_row, error_message, hit_to_result, value_to_id, CollectionRef,
    CreateCollectionRequest, DeleteRequest, Envelope, GetRequest, InsertRequest, QueryRequest,
    SearchRequest,
};

// Re-export core types for convenience.
pub use vectorhub_core::{Document, Metric, SearchResult, VectorStore};

/// Default REST API version segment of the base URI.
pub const API_VERSION: &str = "v1";

const BACKEND: &str = "Milvus";

/// Configuration for connecting to a Milvus instance.
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Database name (default: `default`).
    pub database: String,
    /// REST API version (default: `v1`).
    pub api_version: String,
    /// Collection name (default: `default_collection`).
    pub collection: String,
    /// Primary key field (default: `id`).
    pub primary_field: String,
    /// Vector field (default: `embedding`).
    pub vector_field: String,
    /// Dimension used by [`MilvusVectorStore::initialize`].
    pub dimension: usize,
    /// Metric used by [`MilvusVectorStore::initialize`].
    pub metric: Metric,
}

impl MilvusConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: "default".to_string(),
            api_version: API_VERSION.to_string(),
            collection: "default_collection".to_string(),
            primary_field: "id".to_string(),
            vector_field: "embedding".to_string(),
            dimension: DEFAULT_DIMENSION,
            metric: Metric::Cosine,
        }
    }

    /// Read `MILVUS_HOST`, `MILVUS_PORT` (default 19530), `MILVUS_USER` and
    /// `MILVUS_PASSWORD`.
    pub fn from_env() -> Result<Self, VectorHubError> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| {
                VectorHubError::Config(format!(
                    "you have to provide a {name} env var to connect to Milvus"
                ))
            })
        };
        let port = match std::env::var("MILVUS_PORT") {
            Ok(port) => port
                .parse()
                .map_err(|e| VectorHubError::Config(format!("invalid MILVUS_PORT: {e}")))?,
            Err(_) => 19530,
        };
        Ok(Self::new(
            required("MILVUS_HOST")?,
            port,
            required("MILVUS_USER")?,
            required("MILVUS_PASSWORD")?,
        ))
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_primary_field(mut self, field: impl Into<String>) -> Self {
        self.primary_field = field.into();
        self
    }

    pub fn with_vector_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// `http://{host}:{port}/{api_version}/`.
    pub fn base_uri(&self) -> String {
        format!("http://{}:{}/{}/", self.host, self.port, self.api_version)
    }

    /// The raw `Basic {user}:{password}` value Milvus expects; it is not
    /// Base64-encoded.
    pub fn authorization(&self) -> String {
        format!("Basic {}:{}", self.user, self.password)
    }
}

fn metric_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Cosine => "COSINE",
        Metric::Euclidean => "L2",
        Metric::DotProduct => "IP",
    }
}

/// A [`VectorStore`] implementation backed by [Milvus](https://milvus.io/).
///
/// Payload fields are stored as dynamic fields next to the vector. The
/// collection uses an Int64 primary key, which
/// [`clean_collection`](VectorStore::clean_collection) relies on. Rows
/// without an id get one generated by Milvus; a caller-supplied id must parse
/// as Int64 and is sent as a number, any other id is rejected with
/// [`VectorHubError::Validation`] before a request is sent.
///
/// Scores are similarities, higher is closer. Hits are read with the
/// configured [`MilvusConfig::metric`], so it must match the metric the
/// collection was created with; L2 distances `d` become `1 / (1 + d)`.
///
/// Missing-collection behaviour: Milvus reports success when dropping a
/// collection that does not exist, and the adapter passes that through.
/// A 2xx response whose `code` is neither `0` nor `200` is a
/// [`VectorHubError::Backend`] failure.
pub struct MilvusVectorStore {
    config: MilvusConfig,
    transport: Arc<dyn Transport>,
    output_fields: Vec<String>,
}

impl MilvusVectorStore {
    /// Create a new store; fails when the host or a credential is empty.
    pub fn new(config: MilvusConfig, transport: Arc<dyn Transport>) -> Result<Self, VectorHubError> {
        if config.host.trim().is_empty() {
            return Err(VectorHubError::Config(
                "Milvus host must not be empty".to_string(),
            ));
        }
        if config.user.is_empty() || config.password.is_empty() {
            return Err(VectorHubError::Config(
                "Milvus user and password must not be empty".to_string(),
            ));
        }
        let output_fields = [
            config.primary_field.as_str(),
            "content",
            "formattedContent",
            "sourceType",
            "sourceName",
            "hash",
            "chunkNumber",
            config.vector_field.as_str(),
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        Ok(Self {
            config,
            transport,
            output_fields,
        })
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &MilvusConfig {
        &self.config
    }

    /// Create the collection with the configured dimension and metric.
    pub async fn initialize(&self) -> Result<(), VectorHubError> {
        self.create_collection(self.config.dimension, self.config.metric)
            .await
    }

    /// Names of all collections in the instance.
    pub async fn list_collections(&self) -> Result<Vec<String>, VectorHubError> {
        let data = self.request(Method::Get, "vector/collections", None).await?;
        match data {
            Value::Null => Ok(Vec::new()),
            other => serde_json::from_value(other).map_err(|e| {
                VectorHubError::Parsing(format!("unexpected Milvus collection list: {e}"))
            }),
        }
    }

    /// Raw vector search with an optional boolean filter expression.
    pub async fn search_vector(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&str>,
        output_fields: Option<&[String]>,
    ) -> Result<Value, VectorHubError> {
        let body = SearchRequest {
            db_name: &self.config.database,
            collection_name: &self.config.collection,
            vector,
            limit,
            filter,
            output_fields,
        };
        self.post("vector/search", &body).await
    }

    /// Scalar query, e.g. `query(Some("chunkNumber > 2"), None, 100)`.
    pub async fn query(
        &self,
        filter: Option<&str>,
        output_fields: Option<&[String]>,
        limit: usize,
    ) -> Result<Value, VectorHubError> {
        let body = QueryRequest {
            db_name: &self.config.database,
            collection_name: &self.config.collection,
            limit,
            filter,
            output_fields,
        };
        self.post("vector/query", &body).await
    }

    /// Fetch one entity by primary key.
    pub async fn get_entity(
        &self,
        id: &str,
        output_fields: Option<&[String]>,
    ) -> Result<Value, VectorHubError> {
        let body = GetRequest {
            db_name: &self.config.database,
            collection_name: &self.config.collection,
            id,
            output_fields,
        };
        self.post("vector/get", &body).await
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Value, VectorHubError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::Post, path, Some(body)).await
    }

    /// Send a request and return the `data` payload of the envelope.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, VectorHubError> {
        let mut request = HttpRequest::new(method, format!("{}{}", self.config.base_uri(), path))
            .with_header("Authorization", self.config.authorization())
            .with_header("Accept", "application/json")
            .with_header("Content-Type", "application/json");
        if let Some(body) = body {
            request = request.with_json(body);
        }

        tracing::debug!(path, method = method.as_str(), "Milvus request");
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let detail = match error_message(&response.body) {
                Some(msg) => format!("{msg} ({})", response.body),
                None => response.body.clone(),
            };
            return Err(VectorHubError::from_status(BACKEND, response.status, &detail));
        }

        let envelope: Envelope = serde_json::from_str(&response.body).map_err(|e| {
            VectorHubError::Parsing(format!(
                "unexpected Milvus response ({e}): {}",
                response.body
            ))
        })?;
        if !envelope.is_ok() {
            tracing::warn!(path, code = envelope.code, body = %response.body, "Milvus reported failure");
            return Err(VectorHubError::Backend(format!(
                "Milvus API error (code {}): {} ({})",
                envelope.code,
                envelope.message.as_deref().unwrap_or(""),
                response.body
            )));
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl VectorStore for MilvusVectorStore {
    async fn create_collection(
        &self,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), VectorHubError> {
        validate_dimension(dimension)?;
        let body = CreateCollectionRequest {
            db_name: &self.config.database,
            collection_name: &self.config.collection,
            dimension,
            metric_type: metric_name(metric),
            primary_field: &self.config.primary_field,
            vector_field: &self.config.vector_field,
        };
        self.post("vector/collections/create", &body).await?;
        tracing::info!(collection = %self.config.collection, dimension, %metric, "Milvus collection created");
        Ok(())
    }

    async fn drop_collection(&self) -> Result<(), VectorHubError> {
        let body = CollectionRef {
            db_name: &self.config.database,
            collection_name: &self.config.collection,
        };
        self.post("vector/collections/drop", &body).await?;
        tracing::info!(collection = %self.config.collection, "Milvus collection dropped");
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, VectorHubError> {
        let collections = self.list_collections().await?;
        Ok(collections.iter().any(|c| c == name))
    }

    async fn insert_data(&self, documents: Vec<Document>) -> Result<Vec<String>, VectorHubError> {
        if validate_batch(&documents)?.is_none() {
            return Ok(Vec::new());
        }
        let data = documents
            .iter()
            .map(|doc| {
                document_to_row(doc, &self.config.primary_field, &self.config.vector_field)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let body = InsertRequest {
            db_name: &self.config.database,
            collection_name: &self.config.collection,
            data,
        };
        let data = self.post("vector/insert", &body).await?;

        let ids = data
            .get("insertIds")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if ids.len() != documents.len() {
            return Err(VectorHubError::Parsing(format!(
                "Milvus returned {} ids for {} documents: {data}",
                ids.len(),
                documents.len()
            )));
        }
        Ok(ids.into_iter().map(value_to_id).collect())
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>, VectorHubError> {
        validate_query(embedding, k)?;
        let data = self
            .search_vector(embedding, k, None, Some(self.output_fields.as_slice()))
            .await?;
        let hits = match data {
            Value::Array(hits) => hits,
            Value::Null => Vec::new(),
            other => {
                return Err(VectorHubError::Parsing(format!(
                    "unexpected Milvus search data: {other}"
                )))
            }
        };
        let results = hits
            .into_iter()
            .map(|hit| {
                hit_to_result(
                    hit,
                    &self.config.primary_field,
                    &self.config.vector_field,
                    self.config.metric,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(truncate_results(results, k))
    }

    async fn clean_collection(&self) -> Result<(), VectorHubError> {
        let filter = format!("{} >= 0", self.config.primary_field);
        let body = DeleteRequest {
            db_name: &self.config.database,
            collection_name: &self.config.collection,
            filter: &filter,
        };
        self.post("vector/delete", &body).await?;
        tracing::info!(collection = %self.config.collection, "Milvus collection cleaned");
        Ok(())
    }
}
