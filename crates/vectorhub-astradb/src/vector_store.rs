use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use vectorhub_core::{
    truncate_results, validate_batch, validate_dimension, validate_query, Document, Metric,
    SearchResult, VectorHubError, VectorStore, DEFAULT_DIMENSION,
};
use vectorhub_transport::{HttpRequest, Method, Transport};

use crate::protocol::{
    error_codes, id_to_string, AstraDocument, CollectionsStatus, Command, CreateOptions,
    DeleteStatus, FindCollectionsOptions, FindEnvelope, FindOptions, InsertStatus, Projection,
    StatusEnvelope, VectorOptions, VectorSort,
};

const BACKEND: &str = "AstraDB";

// ---------------------------------------------------------------------------
// AstraDbConfig
// ---------------------------------------------------------------------------

/// Configuration for connecting to an AstraDB database.
#[derive(Debug, Clone)]
pub struct AstraDbConfig {
    /// API endpoint, e.g. `https://<db-id>-<region>.apps.astra.datastax.com`.
    pub endpoint: String,
    /// Application token sent in the `Token` header.
    pub token: String,
    /// Keyspace (default: `default_keyspace`).
    pub keyspace: String,
    /// Collection name (default: `default_collection`).
    pub collection: String,
    /// Dimension used by [`AstraDbVectorStore::initialize`].
    pub dimension: usize,
    /// Metric used by [`AstraDbVectorStore::initialize`].
    pub metric: Metric,
    /// Upper bound on `deleteMany` calls issued by one `clean_collection`
    /// (default: 1000).
    pub max_delete_rounds: usize,
}

impl AstraDbConfig {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            keyspace: "default_keyspace".to_string(),
            collection: "default_collection".to_string(),
            dimension: DEFAULT_DIMENSION,
            metric: Metric::Cosine,
            max_delete_rounds: 1000,
        }
    }

    /// Read `ASTRADB_ENDPOINT` and `ASTRADB_TOKEN`.
    pub fn from_env() -> Result<Self, VectorHubError> {
        let endpoint = std::env::var("ASTRADB_ENDPOINT").map_err(|_| {
            VectorHubError::Config(
                "you have to provide an ASTRADB_ENDPOINT env var to connect to AstraDB".to_string(),
            )
        })?;
        let token = std::env::var("ASTRADB_TOKEN").map_err(|_| {
            VectorHubError::Config(
                "you have to provide an ASTRADB_TOKEN env var to connect to AstraDB".to_string(),
            )
        })?;
        Ok(Self::new(endpoint, token))
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
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

    pub fn with_max_delete_rounds(mut self, rounds: usize) -> Self {
        self.max_delete_rounds = rounds;
        self
    }

    /// `{endpoint}/api/json/v1/{keyspace}/{path}`.
    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/json/v1/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.keyspace,
            path
        )
    }
}

fn metric_name(metric: Metric) -> &'static str {
    match metric {
        Metric::Cosine => "cosine",
        Metric::Euclidean => "euclidean",
        Metric::DotProduct => "dot_product",
    }
}

// ---------------------------------------------------------------------------
// AstraDbVectorStore
// ---------------------------------------------------------------------------

/// A [`VectorStore`] backed by the [AstraDB](https://www.datastax.com/products/datastax-astra)
/// JSON Data API.
///
/// Missing-collection behaviour:
/// - `drop_collection` succeeds silently, AstraDB answers `{"status":{"ok":1}}`.
/// - document commands against a missing collection fail with
///   [`VectorHubError::NotFound`] (`COLLECTION_NOT_EXIST`).
///
/// `insertMany` is not atomic: AstraDB may store a prefix of the batch and
/// still report `errors`, in which case the call fails.
pub struct AstraDbVectorStore {
    config: AstraDbConfig,
    transport: Arc<dyn Transport>,
}

impl AstraDbVectorStore {
    /// Create a store; fails if the endpoint or token is empty.
    pub fn new(
        config: AstraDbConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, VectorHubError> {
        if config.endpoint.trim().is_empty() {
            return Err(VectorHubError::Config(
                "AstraDB endpoint must not be empty".to_string(),
            ));
        }
        if config.token.trim().is_empty() {
            return Err(VectorHubError::Config(
                "AstraDB token must not be empty".to_string(),
            ));
        }
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &AstraDbConfig {
        &self.config
    }

    /// Create the collection with the configured dimension and metric.
    ///
    /// AstraDB accepts a repeated `createCollection` with identical options
    /// and reports an embedded error when the options differ.
    pub async fn initialize(&self) -> Result<(), VectorHubError> {
        self.create_collection(self.config.dimension, self.config.metric)
            .await
    }

    /// Vector dimension of the configured collection, or `0` when the
    /// collection does not exist.
    pub async fn collection_vector_dimension(&self) -> Result<usize, VectorHubError> {
        let collections = self.find_collections().await?;
        Ok(collections
            .collections
            .iter()
            .find(|c| c.name == self.config.collection)
            .map(|c| c.dimension())
            .unwrap_or(0))
    }

    async fn find_collections(&self) -> Result<CollectionsStatus, VectorHubError> {
        let command = Command::FindCollections {
            options: FindCollectionsOptions { explain: true },
        };
        let body = self.send(&command).await?;
        let envelope: StatusEnvelope<CollectionsStatus> = decode(body, command.name())?;
        Ok(envelope.status)
    }

    /// Post one command and return the decoded body.
    ///
    /// A 2xx response carrying `errors` or `error` is still a failure.
    async fn send(&self, command: &Command<'_>) -> Result<Value, VectorHubError> {
        let path = if command.targets_collection() {
            self.config.collection.as_str()
        } else {
            ""
        };
        let request = HttpRequest::new(Method::Post, self.config.url(path))
            .with_header("Token", &self.config.token)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json")
            .with_json(serde_json::to_value(command)?);

        tracing::debug!(command = command.name(), url = %request.url, "AstraDB request");
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(VectorHubError::from_status(
                BACKEND,
                response.status,
                &response.body,
            ));
        }

        let body = response.parse_json()?;
        if body.get("errors").is_some() || body.get("error").is_some() {
            tracing::warn!(command = command.name(), body = %response.body, "AstraDB reported errors");
            let message = format!("AstraDB API error: {}", response.body);
            if error_codes(&body).contains(&"COLLECTION_NOT_EXIST") {
                return Err(VectorHubError::NotFound(message));
            }
            return Err(VectorHubError::Backend(message));
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(body: Value, command: &str) -> Result<T, VectorHubError> {
    serde_json::from_value(body).map_err(|e| {
        VectorHubError::Parsing(format!("unexpected AstraDB {command} response: {e}"))
    })
}

// ---------------------------------------------------------------------------
// VectorStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl VectorStore for AstraDbVectorStore {
    async fn create_collection(
        &self,
        dimension: usize,
        metric: Metric,
    ) -> Result<(), VectorHubError> {
        validate_dimension(dimension)?;
        let command = Command::CreateCollection {
            name: &self.config.collection,
            options: CreateOptions {
                vector: VectorOptions {
                    dimension,
                    metric: metric_name(metric),
                },
            },
        };
        self.send(&command).await?;
        tracing::info!(collection = %self.config.collection, dimension, %metric, "AstraDB collection created");
        Ok(())
    }

    async fn drop_collection(&self) -> Result<(), VectorHubError> {
        let command = Command::DeleteCollection {
            name: &self.config.collection,
        };
        self.send(&command).await?;
        tracing::info!(collection = %self.config.collection, "AstraDB collection deleted");
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, VectorHubError> {
        let collections = self.find_collections().await?;
        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    async fn insert_data(&self, documents: Vec<Document>) -> Result<Vec<String>, VectorHubError> {
        if validate_batch(&documents)?.is_none() {
            return Ok(Vec::new());
        }
        let command = Command::InsertMany {
            documents: documents.iter().map(AstraDocument::from).collect(),
        };
        let body = self.send(&command).await?;
        let envelope: StatusEnvelope<InsertStatus> = decode(body.clone(), command.name())?;
        let ids = envelope.status.inserted_ids;
        if ids.len() != documents.len() {
            return Err(VectorHubError::Parsing(format!(
                "AstraDB returned {} ids for {} documents: {body}",
                ids.len(),
                documents.len()
            )));
        }
        Ok(ids.into_iter().map(id_to_string).collect())
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>, VectorHubError> {
        validate_query(embedding, k)?;
        let command = Command::Find {
            sort: VectorSort { vector: embedding },
            projection: Projection::PAYLOAD,
            options: FindOptions {
                include_similarity: true,
                include_sort_vector: false,
                limit: k,
            },
        };
        let body = self.send(&command).await?;
        let envelope: FindEnvelope = decode(body, command.name())?;
        let results = envelope
            .data
            .documents
            .into_iter()
            .map(SearchResult::from)
            .collect();
        Ok(truncate_results(results, k))
    }

    async fn clean_collection(&self) -> Result<(), VectorHubError> {
        // deleteMany removes a bounded number of documents per call and
        // flags the remainder with `moreData`.
        for round in 1..=self.config.max_delete_rounds {
            let command = Command::DeleteMany {};
            let body = self.send(&command).await?;
            let envelope: StatusEnvelope<DeleteStatus> = decode(body, command.name())?;
            if !envelope.status.more_data {
                tracing::info!(collection = %self.config.collection, rounds = round, "AstraDB collection cleaned");
                return Ok(());
            }
        }
        Err(VectorHubError::Backend(format!(
            "AstraDB still reported moreData after {} deleteMany calls on {}",
            self.config.max_delete_rounds, self.config.collection
        )))
    }
}
