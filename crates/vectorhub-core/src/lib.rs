//! Core traits and types shared by every vectorhub adapter.
//!
//! Callers program against [`VectorStore`] and the backend-neutral
//! [`Document`] / [`SearchResult`] model. Adapter crates translate this
//! contract into their backend's wire format and map every failure onto
//! [`VectorHubError`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vector dimension used by `initialize` calls when none is configured.
pub const DEFAULT_DIMENSION: usize = 1536;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for all vectorhub adapters.
#[derive(Debug, Error)]
pub enum VectorHubError {
    /// The request could not be sent or no response was received.
    #[error("transport error: {0}")]
    Transport(String),
    /// Authentication or authorization was rejected (HTTP 401/403).
    #[error("auth error: {0}")]
    Auth(String),
    /// The referenced collection or document does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Malformed request, detected locally or reported by the backend.
    #[error("validation error: {0}")]
    Validation(String),
    /// Failure reported by the backend inside an otherwise valid response.
    #[error("backend error: {0}")]
    Backend(String),
    /// Input rejected by a prompt-safety service.
    #[error("security error: {0}")]
    Security(String),
    /// Invalid or incomplete adapter configuration.
    #[error("config error: {0}")]
    Config(String),
    /// A response body could not be decoded.
    #[error("parsing error: {0}")]
    Parsing(String),
}

impl VectorHubError {
    /// Map a non-2xx HTTP status onto the error taxonomy.
    ///
    /// `detail` is kept verbatim in the message; adapters pass the raw
    /// response body (or a message extracted from it plus the body).
    pub fn from_status(backend: &str, status: u16, detail: &str) -> Self {
        let message = format!("{backend} API error (HTTP {status}): {detail}");
        match status {
            401 | 403 => Self::Auth(message),
            404 => Self::NotFound(message),
            400 | 422 => Self::Validation(message),
            _ => Self::Backend(message),
        }
    }
}

impl From<serde_json::Error> for VectorHubError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parsing(e.to_string())
    }
}

/// Returns `true` for 2xx status codes.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// Distance metric of a collection.
///
/// Not every backend supports every metric; adapters reject unsupported
/// ones with [`VectorHubError::Validation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::DotProduct => "dot_product",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Document / SearchResult
// ---------------------------------------------------------------------------

/// A chunk of source text together with its embedding.
///
/// `id` is `None` until the backend assigns one, unless the caller sets it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_content: Option<String>,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub chunk_number: u32,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Document {
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            content: content.into(),
            embedding,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_formatted_content(mut self, formatted: impl Into<String>) -> Self {
        self.formatted_content = Some(formatted.into());
        self
    }

    /// Set where the chunk came from, e.g. `("files", "README.md")`.
    pub fn with_source(
        mut self,
        source_type: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        self.source_type = source_type.into();
        self.source_name = source_name.into();
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    pub fn with_chunk_number(mut self, chunk_number: u32) -> Self {
        self.chunk_number = chunk_number;
        self
    }
}

/// A document returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    /// Similarity to the query, higher is closer. Adapters convert backend
    /// distances so an exact match scores highest on every backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl SearchResult {
    pub fn new(document: Document, score: Option<f32>) -> Self {
        Self { document, score }
    }
}

// ---------------------------------------------------------------------------
// Local validation
// ---------------------------------------------------------------------------

/// Reject a zero dimension before any request is sent.
pub fn validate_dimension(dimension: usize) -> Result<(), VectorHubError> {
    if dimension == 0 {
        return Err(VectorHubError::Validation(
            "collection dimension must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Check that a batch carries non-empty embeddings of one common length.
///
/// Returns that length, or `None` for an empty batch.
pub fn validate_batch(documents: &[Document]) -> Result<Option<usize>, VectorHubError> {
    let Some(first) = documents.first() else {
        return Ok(None);
    };
    let dimension = first.embedding.len();
    if dimension == 0 {
        return Err(VectorHubError::Validation(
            "document 0 has an empty embedding".to_string(),
        ));
    }
    for (i, doc) in documents.iter().enumerate().skip(1) {
        if doc.embedding.len() != dimension {
            return Err(VectorHubError::Validation(format!(
                "document {i} has embedding length {}, expected {dimension}",
                doc.embedding.len()
            )));
        }
    }
    Ok(Some(dimension))
}

/// Check the arguments of a similarity search.
pub fn validate_query(embedding: &[f32], k: usize) -> Result<(), VectorHubError> {
    if k == 0 {
        return Err(VectorHubError::Validation(
            "k must be a positive integer".to_string(),
        ));
    }
    if embedding.is_empty() {
        return Err(VectorHubError::Validation(
            "query embedding is empty".to_string(),
        ));
    }
    Ok(())
}

/// Cap a result list at `k` entries.
pub fn truncate_results(mut results: Vec<SearchResult>, k: usize) -> Vec<SearchResult> {
    results.truncate(k);
    results
}

// ---------------------------------------------------------------------------
// VectorStore trait
// ---------------------------------------------------------------------------

/// The capability set every backend adapter exposes.
///
/// Adapters are bound to one configured collection; only
/// [`collection_exists`](VectorStore::collection_exists) takes a name.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the configured collection with the given dimension and metric.
    async fn create_collection(&self, dimension: usize, metric: Metric)
        -> Result<(), VectorHubError>;

    /// Delete the configured collection and its documents.
    async fn drop_collection(&self) -> Result<(), VectorHubError>;

    /// Whether a collection with this name exists.
    async fn collection_exists(&self, name: &str) -> Result<bool, VectorHubError>;

    /// Insert a batch in one backend call, returning ids in input order.
    async fn insert_data(&self, documents: Vec<Document>) -> Result<Vec<String>, VectorHubError>;

    /// Return at most `k` documents closest to `embedding`.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchResult>, VectorHubError>;

    /// Delete every document while keeping the collection.
    async fn clean_collection(&self) -> Result<(), VectorHubError>;
}

// ---------------------------------------------------------------------------
// QueryTransformer trait
// ---------------------------------------------------------------------------

/// Rewrites or screens a user query before retrieval.
#[async_trait]
pub trait QueryTransformer: Send + Sync {
    async fn transform_query(&self, query: &str) -> Result<Vec<String>, VectorHubError>;
}
