use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;
use vectorhub_core::{
    truncate_results, validate_batch, validate_dimension, validate_query, Document, Metric,
    SearchResult, VectorHubError, VectorStore, DEFAULT_DIMENSION,
};
use vectorhub_transport::{HttpRequest, HttpResponse, Method, Transport};

use crate::protocol::{
    document_to_value, parse_import, schema, MultiSearchRequest, MultiSearchResponse,
    SearchQuery,
};

const BACKEND: &str = "Typesense";

// ---------------------------------------------------------------------------
// TypesenseConfig
// ---------------------------------------------------------------------------

/// Configuration for connecting to a Typesense node.
#[derive(Debug, Clone)]
pub struct TypesenseConfig {
    /// Node URL (default: `http://localhost:8108`).
    pub node: String,
    /// Admin or scoped API key sent as `X-TYPESENSE-API-KEY`.
    pub api_key: String,
    /// Collection name (default: `default_collection`).
    pub collection: String,
    /// Name of the `float[]` vector field (default: `embedding`).
    pub vector_field: String,
    pub dimension: usize,
    pub metric: Metric,
}

impl TypesenseConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            node: "http://localhost:8108".to_string(),
            api_key: api_key.into(),
            collection: "default_collection".to_string(),
            vector_field: "embedding".to_string(),
            dimension: DEFAULT_DIMENSION,
            metric: Metric::Cosine,
        }
    }

    /// Read `TYPESENSE_API_KEY` and, when set, `TYPESENSE_NODE`.
    pub fn from_env() -> Result<Self, VectorHubError> {
        let api_key = std::env::var("TYPESENSE_API_KEY").map_err(|_| {
            VectorHubError::Config(
                "you have to provide a TYPESENSE_API_KEY env var to connect to Typesense"
                    .to_string(),
            )
        })?;
        let config = Self::new(api_key);
        Ok(match std::env::var("TYPESENSE_NODE") {
            Ok(node) => config.with_node(node),
            Err(_) => config,
        })
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
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

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.node.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn vec_dist(metric: Metric) -> Result<&'static str, VectorHubError> {
    match metric {
        Metric::Cosine => Ok("cosine"),
        Metric::DotProduct => Ok("ip"),
        Metric::Euclidean => Err(VectorHubError::Validation(
            "Typesense supports only cosine and inner-product distance".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// TypesenseVectorStore
// ---------------------------------------------------------------------------

/// A [`VectorStore`] backed by [Typesense](https://typesense.org/).
///
/// - Create: `POST /collections` with an explicit schema
/// - Insert: `POST /collections/{name}/documents/import?action=upsert` (JSONL)
/// - Search: `POST /multi_search` with a batch of one `vector_query`; at
///   most 250 hits come back per call, so larger `k` yield 250 results
/// - Clean: `DELETE /collections/{name}/documents?truncate=true`
///
/// Creating an existing collection fails with HTTP 409 and dropping a
/// missing one surfaces as [`VectorHubError::NotFound`]. Imports are not
/// atomic: rejected lines are reported while accepted ones stay stored.
pub struct TypesenseVectorStore {
    config: TypesenseConfig,
    transport: Arc<dyn Transport>,
}

impl TypesenseVectorStore {
    /// Create a store; fails if the node or API key is empty.
    pub fn new(
        config: TypesenseConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, VectorHubError> {
        if config.node.trim().is_empty() {
            return Err(VectorHubError::Config(
                "Typesense node must not be empty".to_string(),
            ));
        }
        if config.api_key.trim().is_empty() {
            return Err(VectorHubError::Config(
                "Typesense API key must not be empty".to_string(),
            ));
        }
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &TypesenseConfig {
        &self.config
    }

    /// Create the collection with the configured dimension and metric.
    pub async fn initialize(&self) -> Result<(), VectorHubError> {
        self.create_collection(self.config.dimension, self.config.metric)
            .await
    }

    /// Upsert a single document, returning its id.
    pub async fn upsert(&self, document: &Document) -> Result<String, VectorHubError> {
        let id = document
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let body = document_to_value(document, &id, &self.config.vector_field)?;
        let path = format!(
            "/collections/{}/documents?action=upsert",
            self.config.collection
        );
        let response = self
            .send(self.request(Method::Post, &path).with_json(body))
            .await?;
        expect_success(&response)?;
        Ok(id)
    }

    fn request(&self, method: Method, path: &str) -> HttpRequest {
        HttpRequest::new(method, self.config.url(path))
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_header("X-TYPESENSE-API-KEY", &self.config.api_key)
    }

    /// Send a request. Status interpretation is left to the caller because
    /// the existence check treats 404 specially.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, VectorHubError> {
        tracing::debug!(method = request.method.as_str(), url = %request.url, "Typesense request");
        let response = self.transport.send(request).await?;
        tracing::debug!(status = response.status, "Typesense response");
        Ok(response)
    }
}

fn expect_success(response: &HttpResponse) -> Result<(), VectorHubError> {
    if !response.is_success() {
        return Err(VectorHubError::from_status(
            BACKEND,
            response.status,
            &response.body,
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// VectorStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl VectorStore for TypesenseVectorStore {
    async fn create_collection(
        &self,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), VectorHubError> {
        validate_dimension(dimension)?;
        let schema = schema(
            &self.config.collection,
            &self.config.vector_field,
            dimension,
            vec_dist(metric)?,
        );
        let request = self
            .request(Method::Post, "/collections")
            .with_json(serde_json::to_value(schema)?);
        let response = self.send(request).await?;
        expect_success(&response)?;
        tracing::info!(collection = %self.config.collection, dimension, %metric, "Typesense collection created");
        Ok(())
    }

    async fn drop_collection(&self) -> Result<(), VectorHubError> {
        let path = format!("/collections/{}", self.config.collection);
        let response = self.send(self.request(Method::Delete, &path)).await?;
        expect_success(&response)?;
        tracing::info!(collection = %self.config.collection, "Typesense collection dropped");
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, VectorHubError> {
        let path = format!("/collections/{name}");
        let response = self.send(self.request(Method::Get, &path)).await?;
        if response.status == 404 {
            return Ok(false);
        }
        expect_success(&response)?;
        let body = response.parse_json()?;
        Ok(body.get("name").is_some())
    }

    async fn insert_data(&self, documents: Vec<Document>) -> Result<Vec<String>, VectorHubError> {
        if validate_batch(&documents)?.is_none() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = documents
            .iter()
            .map(|doc| {
                doc.id
                    .clone()
                    .unwrap_or_else(|| Uuid::new_v4().to_string())
            })
            .collect();
        let lines = documents
            .iter()
            .zip(&ids)
            .map(|(doc, id)| document_to_value(doc, id, &self.config.vector_field))
            .collect::<Result<Vec<_>, _>>()?;

        let path = format!(
            "/collections/{}/documents/import?action=upsert",
            self.config.collection
        );
        let request = self.request(Method::Post, &path).with_ndjson(lines);
        let response = self.send(request).await?;
        expect_success(&response)?;

        let rejected: Vec<String> = parse_import(&response.body)?
            .into_iter()
            .enumerate()
            .filter(|(_, line)| !line.success)
            .map(|(i, line)| {
                let reason = line.error.as_deref().unwrap_or("rejected");
                match line.document {
                    Some(document) => format!("document {i}: {reason} ({document})"),
                    None => format!("document {i}: {reason}"),
                }
            })
            .collect();
        if !rejected.is_empty() {
            tracing::warn!(rejected = rejected.len(), "Typesense rejected documents");
            return Err(VectorHubError::Validation(format!(
                "Typesense rejected {} of {} documents: {}; body: {}",
                rejected.len(),
                ids.len(),
                rejected.join("; "),
                response.body
            )));
        }
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>, VectorHubError> {
        validate_query(embedding, k)?;
        let request_body = MultiSearchRequest {
            searches: vec![SearchQuery::nearest(
                &self.config.collection,
                &self.config.vector_field,
                embedding,
                k,
            )?],
        };
        let request = self
            .request(Method::Post, "/multi_search")
            .with_json(serde_json::to_value(request_body)?);
        let response = self.send(request).await?;
        expect_success(&response)?;

        let parsed: MultiSearchResponse = serde_json::from_str(&response.body).map_err(|e| {
            VectorHubError::Parsing(format!(
                "unexpected Typesense multi_search response ({e}): {}",
                response.body
            ))
        })?;
        let Some(result_set) = parsed.results.into_iter().next() else {
            return Ok(Vec::new());
        };
        if let Some(error) = result_set.error {
            let status = result_set.code.unwrap_or(500);
            return Err(VectorHubError::from_status(
                BACKEND,
                status,
                &format!("{error} ({})", response.body),
            ));
        }

        let results = result_set
            .hits
            .into_iter()
            .map(|hit| hit.into_result(&self.config.vector_field))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(truncate_results(results, k))
    }

    async fn clean_collection(&self) -> Result<(), VectorHubError> {
        let path = format!(
            "/collections/{}/documents?truncate=true",
            self.config.collection
        );
        let response = self.send(self.request(Method::Delete, &path)).await?;
        expect_success(&response)?;
        let deleted = response
            .parse_json()
            .ok()
            .and_then(|body| body.get("num_deleted").and_then(Value::as_u64))
            .unwrap_or(0);
        tracing::info!(collection = %self.config.collection, deleted, "Typesense collection cleaned");
        Ok(())
    }
}
