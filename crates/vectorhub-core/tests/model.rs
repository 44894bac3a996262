use serde_json::json;
use vectorhub_core::{
    validate_batch, validate_dimension, validate_query, Document, VectorHubError,
};

#[test]
fn document_serializes_camel_case_payload() {
    let doc = Document::new("hello", vec![0.5, 0.25])
        .with_source("files", "README.md")
        .with_hash("abc")
        .with_chunk_number(3);
    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(
        value,
        json!({
            "content": "hello",
            "sourceType": "files",
            "sourceName": "README.md",
            "hash": "abc",
            "chunkNumber": 3,
            "embedding": [0.5, 0.25],
        })
    );
}

#[test]
fn document_deserializes_with_missing_optional_fields() {
    let doc: Document = serde_json::from_value(json!({"content": "only text"})).unwrap();
    assert_eq!(doc.content, "only text");
    assert!(doc.id.is_none());
    assert!(doc.embedding.is_empty());
    assert_eq!(doc.chunk_number, 0);
}

#[test]
fn status_mapping_covers_taxonomy() {
    assert!(matches!(
        VectorHubError::from_status("Test", 401, "nope"),
        VectorHubError::Auth(_)
    ));
    assert!(matches!(
        VectorHubError::from_status("Test", 403, "nope"),
        VectorHubError::Auth(_)
    ));
    assert!(matches!(
        VectorHubError::from_status("Test", 404, "gone"),
        VectorHubError::NotFound(_)
    ));
    assert!(matches!(
        VectorHubError::from_status("Test", 400, "bad"),
        VectorHubError::Validation(_)
    ));
    assert!(matches!(
        VectorHubError::from_status("Test", 503, "down"),
        VectorHubError::Backend(_)
    ));
}

#[test]
fn status_error_keeps_body_text() {
    let err = VectorHubError::from_status("Typesense", 500, r#"{"message":"boom"}"#);
    let text = err.to_string();
    assert!(text.contains("HTTP 500"));
    assert!(text.contains(r#"{"message":"boom"}"#));
}

#[test]
fn zero_dimension_is_rejected() {
    assert!(matches!(
        validate_dimension(0),
        Err(VectorHubError::Validation(_))
    ));
    assert!(validate_dimension(4).is_ok());
}

#[test]
fn batch_with_mixed_lengths_is_rejected() {
    let docs = vec![
        Document::new("a", vec![0.1, 0.2]),
        Document::new("b", vec![0.1, 0.2, 0.3]),
    ];
    let err = validate_batch(&docs).unwrap_err();
    assert!(err.to_string().contains("document 1"));
}

#[test]
fn batch_validation_reports_dimension() {
    assert_eq!(validate_batch(&[]).unwrap(), None);
    let docs = vec![Document::new("a", vec![0.0; 4]), Document::new("b", vec![1.0; 4])];
    assert_eq!(validate_batch(&docs).unwrap(), Some(4));
    assert!(validate_batch(&[Document::new("empty", vec![])]).is_err());
}

#[test]
fn query_requires_positive_k_and_vector() {
    assert!(validate_query(&[0.1], 0).is_err());
    assert!(validate_query(&[], 3).is_err());
    assert!(validate_query(&[0.1], 1).is_ok());
}

#[test]
fn json_errors_become_parsing_errors() {
    let err: VectorHubError = serde_json::from_str::<serde_json::Value>("{not json")
        .unwrap_err()
        .into();
    assert!(matches!(err, VectorHubError::Parsing(_)));
}
