use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vectorhub_core::{Document, Metric, SearchResult, VectorHubError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCollectionRequest<'a> {
    pub db_name: &'a str,
    pub collection_name: &'a str,
    pub dimension: usize,
    pub metric_type: &'static str,
    pub primary_field: &'a str,
    pub vector_field: &'a str,
}

/// Body shared by every call that only names the collection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CollectionRef<'a> {
    pub db_name: &'a str,
    pub collection_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InsertRequest<'a> {
    pub db_name: &'a str,
    pub collection_name: &'a str,
    pub data: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRequest<'a> {
    pub db_name: &'a str,
    pub collection_name: &'a str,
    pub vector: &'a [f32],
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_fields: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryRequest<'a> {
    pub db_name: &'a str,
    pub collection_name: &'a str,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_fields: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetRequest<'a> {
    pub db_name: &'a str,
    pub collection_name: &'a str,
    pub id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_fields: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteRequest<'a> {
    pub db_name: &'a str,
    pub collection_name: &'a str,
    pub filter: &'a str,
}

/// `{code, data}` envelope of every successful response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Milvus v1 reports `200` on success; some deployments report `0`.
    pub(crate) fn is_ok(&self) -> bool {
        self.code == 0 || self.code == 200
    }
}

/// Message of a non-2xx body: `error_msg`, falling back to `message`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error_msg")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub(crate) fn value_to_id(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Build one insert row: payload fields plus the vector, and the primary key
/// only when the caller supplied an id. The primary key is Int64, so a
/// supplied id must parse as one.
pub(crate) fn document_to_row(
    doc: &Document,
    primary_field: &str,
    vector_field: &str,
) -> Result<Value, VectorHubError> {
    let mut row = Map::new();
    if let Some(ref id) = doc.id {
        let key: i64 = id.trim().parse().map_err(|_| {
            VectorHubError::Validation(format!(
                "Milvus primary key `{primary_field}` is Int64, got id {id:?}"
            ))
        })?;
        row.insert(primary_field.to_string(), Value::from(key));
    }
    row.insert("content".to_string(), Value::String(doc.content.clone()));
    if let Some(ref formatted) = doc.formatted_content {
        row.insert(
            "formattedContent".to_string(),
            Value::String(formatted.clone()),
        );
    }
    row.insert(
        "sourceType".to_string(),
        Value::String(doc.source_type.clone()),
    );
    row.insert(
        "sourceName".to_string(),
        Value::String(doc.source_name.clone()),
    );
    row.insert("hash".to_string(), Value::String(doc.hash.clone()));
    row.insert("chunkNumber".to_string(), Value::from(doc.chunk_number));
    row.insert(vector_field.to_string(), serde_json::to_value(&doc.embedding)?);
    Ok(Value::Object(row))
}

/// Turn the `distance` of a hit into a similarity, higher is closer.
/// COSINE and IP already report a similarity; L2 reports a squared distance.
pub(crate) fn similarity(metric: Metric, distance: f32) -> f32 {
    match metric {
        Metric::Euclidean => 1.0 / (1.0 + distance),
        Metric::Cosine | Metric::DotProduct => distance,
    }
}

/// Translate one search hit. `distance` becomes the score.
pub(crate) fn hit_to_result(
    hit: Value,
    primary_field: &str,
    vector_field: &str,
    metric: Metric,
) -> Result<SearchResult, VectorHubError> {
    let mut fields = match hit {
        Value::Object(fields) => fields,
        other => {
            return Err(VectorHubError::Parsing(format!(
                "unexpected Milvus search hit: {other}"
            )))
        }
    };
    let id = fields.remove(primary_field).map(value_to_id);
    let embedding: Vec<f32> = match fields.remove(vector_field) {
        Some(vector) => serde_json::from_value(vector)?,
        None => Vec::new(),
    };
    let score = fields
        .remove("distance")
        .and_then(|d| d.as_f64())
        .map(|d| similarity(metric, d as f32));
    fields.remove("id");
    fields.remove("embedding");

    let mut document: Document = serde_json::from_value(Value::Object(fields))?;
    document.id = id;
    document.embedding = embedding;
    Ok(SearchResult::new(document, score))
}
