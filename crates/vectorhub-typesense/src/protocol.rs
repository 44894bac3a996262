use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vectorhub_core::{Document, SearchResult, VectorHubError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct CollectionSchema<'a> {
    pub name: &'a str,
    pub fields: Vec<Field<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Field<'a> {
    pub name: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_dim: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vec_dist: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl<'a> Field<'a> {
    fn scalar(name: &'a str, kind: &'static str) -> Self {
        Self {
            name,
            kind,
            num_dim: None,
            vec_dist: None,
            optional: false,
        }
    }
}

/// The schema must list every field before documents can be written.
pub(crate) fn schema<'a>(
    name: &'a str,
    vector_field: &'a str,
    dimension: usize,
    vec_dist: &'static str,
) -> CollectionSchema<'a> {
    CollectionSchema {
        name,
        fields: vec![
            Field {
                name: vector_field,
                kind: "float[]",
                num_dim: Some(dimension),
                vec_dist: Some(vec_dist),
                optional: false,
            },
            Field::scalar("id", "string"),
            Field::scalar("content", "string"),
            Field {
                optional: true,
                ..Field::scalar("formattedContent", "string")
            },
            Field::scalar("hash", "string"),
            Field::scalar("sourceName", "string"),
            Field::scalar("sourceType", "string"),
            Field::scalar("chunkNumber", "int32"),
        ],
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Payload<'a> {
    id: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    formatted_content: Option<&'a str>,
    hash: &'a str,
    source_name: &'a str,
    source_type: &'a str,
    chunk_number: u32,
}

/// Encode one document under `id`, with the embedding stored in
/// `vector_field`.
pub(crate) fn document_to_value(
    doc: &Document,
    id: &str,
    vector_field: &str,
) -> Result<Value, VectorHubError> {
    let payload = Payload {
        id,
        content: &doc.content,
        formatted_content: doc.formatted_content.as_deref(),
        hash: &doc.hash,
        source_name: &doc.source_name,
        source_type: &doc.source_type,
        chunk_number: doc.chunk_number,
    };
    let mut value = serde_json::to_value(payload)?;
    value[vector_field] = serde_json::to_value(&doc.embedding)?;
    Ok(value)
}

fn value_to_document(
    fields: Map<String, Value>,
    vector_field: &str,
) -> Result<Document, VectorHubError> {
    let mut fields = fields;
    let embedding: Vec<f32> = match fields.remove(vector_field) {
        Some(vector) => serde_json::from_value(vector)?,
        None => Vec::new(),
    };
    let mut document: Document = serde_json::from_value(Value::Object(fields))?;
    document.embedding = embedding;
    Ok(document)
}

/// One line of an import response.
#[derive(Debug, Deserialize)]
pub(crate) struct ImportLine {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

/// Parse a JSONL import response, skipping blank lines.
pub(crate) fn parse_import(body: &str) -> Result<Vec<ImportLine>, VectorHubError> {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                VectorHubError::Parsing(format!("unexpected Typesense import line ({e}): {line}"))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Multi search
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct MultiSearchRequest<'a> {
    pub searches: Vec<SearchQuery<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchQuery<'a> {
    pub collection: &'a str,
    pub q: &'static str,
    pub vector_query: String,
    pub per_page: usize,
}

/// Largest page Typesense serves; larger `per_page` values are rejected.
pub(crate) const MAX_PER_PAGE: usize = 250;

impl<'a> SearchQuery<'a> {
    /// Pure nearest-neighbour query: `q=*` with a `vector_query`. `k` is
    /// passed unchanged to the vector search, the page is capped at
    /// [`MAX_PER_PAGE`].
    pub(crate) fn nearest(
        collection: &'a str,
        vector_field: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Self, VectorHubError> {
        let vector = serde_json::to_string(embedding)?;
        Ok(Self {
            collection,
            q: "*",
            vector_query: format!("{vector_field}:({vector}, k:{k})"),
            per_page: k.min(MAX_PER_PAGE),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MultiSearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResultSet>,
}

/// One entry of `results`. A failed search reports `error`/`code` here while
/// the HTTP status stays 200.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResultSet {
    #[serde(default)]
    pub hits: Vec<Hit>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Hit {
    pub document: Map<String, Value>,
    #[serde(default)]
    pub vector_distance: Option<f32>,
}

impl Hit {
    /// `vector_distance` is `1 - similarity` for both cosine and ip, so the
    /// score is turned back into a similarity.
    pub(crate) fn into_result(self, vector_field: &str) -> Result<SearchResult, VectorHubError> {
        let document = value_to_document(self.document, vector_field)?;
        let score = self.vector_distance.map(|distance| 1.0 - distance);
        Ok(SearchResult::new(document, score))
    }
}
