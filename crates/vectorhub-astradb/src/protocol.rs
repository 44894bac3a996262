//! AstraDB Data API envelopes.
//!
//! Every request is a single-key object naming the command; responses carry
//! `status` for mutations and administration, `data.documents` for `find`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vectorhub_core::{Document, SearchResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Command<'a> {
    CreateCollection {
        name: &'a str,
        options: CreateOptions,
    },
    FindCollections {
        options: FindCollectionsOptions,
    },
    DeleteCollection {
        name: &'a str,
    },
    InsertMany {
        documents: Vec<AstraDocument<'a>>,
    },
    Find {
        sort: VectorSort<'a>,
        projection: Projection,
        options: FindOptions,
    },
    /// Empty filter: matches every document.
    DeleteMany {},
}

impl Command<'_> {
    /// Document commands are posted to the collection path, administration
    /// commands to the keyspace path.
    pub(crate) fn targets_collection(&self) -> bool {
        matches!(
            self,
            Command::InsertMany { .. } | Command::Find { .. } | Command::DeleteMany {}
        )
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::CreateCollection { .. } => "createCollection",
            Command::FindCollections { .. } => "findCollections",
            Command::DeleteCollection { .. } => "deleteCollection",
            Command::InsertMany { .. } => "insertMany",
            Command::Find { .. } => "find",
            Command::DeleteMany {} => "deleteMany",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateOptions {
    pub vector: VectorOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct VectorOptions {
    pub dimension: usize,
    pub metric: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct FindCollectionsOptions {
    pub explain: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AstraDocument<'a> {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_content: Option<&'a str>,
    pub source_type: &'a str,
    pub source_name: &'a str,
    pub hash: &'a str,
    pub chunk_number: u32,
    #[serde(rename = "$vector")]
    pub vector: &'a [f32],
}

impl<'a> From<&'a Document> for AstraDocument<'a> {
    fn from(doc: &'a Document) -> Self {
        Self {
            id: doc.id.as_deref(),
            content: &doc.content,
            formatted_content: doc.formatted_content.as_deref(),
            source_type: &doc.source_type,
            source_name: &doc.source_name,
            hash: &doc.hash,
            chunk_number: doc.chunk_number,
            vector: &doc.embedding,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct VectorSort<'a> {
    #[serde(rename = "$vector")]
    pub vector: &'a [f32],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Projection {
    #[serde(rename = "_id")]
    id: u8,
    content: u8,
    formatted_content: u8,
    source_type: u8,
    source_name: u8,
    hash: u8,
    chunk_number: u8,
    #[serde(rename = "$vector")]
    vector: u8,
}

impl Projection {
    /// Project every payload field plus the vector.
    pub(crate) const PAYLOAD: Projection = Projection {
        id: 1,
        content: 1,
        formatted_content: 1,
        source_type: 1,
        source_name: 1,
        hash: 1,
        chunk_number: 1,
        vector: 1,
    };
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FindOptions {
    pub include_similarity: bool,
    pub include_sort_vector: bool,
    pub limit: usize,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct StatusEnvelope<T> {
    pub status: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InsertStatus {
    #[serde(default)]
    pub inserted_ids: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteStatus {
    #[serde(default)]
    pub more_data: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionsStatus {
    #[serde(default)]
    pub collections: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionEntry {
    pub name: String,
    #[serde(default)]
    pub options: Option<CollectionOptions>,
}

impl CollectionEntry {
    pub(crate) fn dimension(&self) -> usize {
        self.options
            .as_ref()
            .and_then(|o| o.vector.as_ref())
            .map(|v| v.dimension)
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionOptions {
    #[serde(default)]
    pub vector: Option<CollectionVector>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionVector {
    #[serde(default)]
    pub dimension: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FindEnvelope {
    pub data: FindData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FindData {
    #[serde(default)]
    pub documents: Vec<FoundDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FoundDocument {
    #[serde(rename = "_id", default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub formatted_content: Option<String>,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub chunk_number: u32,
    #[serde(rename = "$vector", default)]
    pub vector: Vec<f32>,
    #[serde(rename = "$similarity", default)]
    pub similarity: Option<f32>,
}

impl From<FoundDocument> for SearchResult {
    fn from(found: FoundDocument) -> Self {
        let document = Document {
            id: found.id.map(id_to_string),
            content: found.content,
            formatted_content: found.formatted_content,
            source_type: found.source_type,
            source_name: found.source_name,
            hash: found.hash,
            chunk_number: found.chunk_number,
            embedding: found.vector,
        };
        SearchResult::new(document, found.similarity)
    }
}

/// Document ids are usually strings but may be typed (`{"$uuid": ".."}`) or
/// numeric.
pub(crate) fn id_to_string(id: Value) -> String {
    match id {
        Value::String(s) => s,
        Value::Object(map) if map.len() == 1 => match map.into_iter().next() {
            Some((_, Value::String(s))) => s,
            Some((key, value)) => format!("{{\"{key}\":{value}}}"),
            None => String::new(),
        },
        other => other.to_string(),
    }
}

/// The `errorCode` values of an embedded `errors` array.
pub(crate) fn error_codes(body: &Value) -> Vec<&str> {
    body.get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e.get("errorCode").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}
