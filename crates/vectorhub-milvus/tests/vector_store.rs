use std::sync::Arc;

use serde_json::json;
use vectorhub_core::VectorHubError;
use vectorhub_milvus::{Document, Metric, MilvusConfig, MilvusVectorStore, VectorStore};
use vectorhub_transport::{Body, FakeTransport, HttpResponse, Method};

fn config() -> MilvusConfig {
    MilvusConfig::new("milvus.local", 19530, "root", "Milvus")
        .with_database("rag")
        .with_collection("docs")
}

fn setup(transport: Arc<FakeTransport>) -> MilvusVectorStore {
    MilvusVectorStore::new(config(), transport).unwrap()
}

fn sample_document() -> Document {
    Document::new("Milvus stores vectors", vec![0.1, 0.2, 0.3, 0.4])
        .with_source("files", "milvus.md")
        .with_hash("h-9")
        .with_chunk_number(1)
}

#[test]
fn construction_requires_credentials() {
    let transport = Arc::new(FakeTransport::new());
    let config = MilvusConfig::new("milvus.local", 19530, "", "");
    let err = MilvusVectorStore::new(config, transport).err();
    assert!(matches!(err, Some(VectorHubError::Config(_))));
}

#[test]
fn builders_override_defaults() {
    let config = config()
        .with_api_version("v2")
        .with_primary_field("pk")
        .with_vector_field("vec")
        .with_dimension(768)
        .with_metric(Metric::Euclidean);
    assert_eq!(config.base_uri(), "http://milvus.local:19530/v2/");
    assert_eq!(config.primary_field, "pk");
    assert_eq!(config.vector_field, "vec");
    assert_eq!(config.dimension, 768);
    assert_eq!(config.metric, Metric::Euclidean);
}

#[tokio::test]
async fn create_collection_request_shape() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(200, json!({"code": 200, "data": {}}));
    let store = setup(transport.clone());

    store.create_collection(4, Metric::Euclidean).await.unwrap();

    let request = transport.last_request().await.unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(
        request.url,
        "http://milvus.local:19530/v1/vector/collections/create"
    );
    assert_eq!(request.header("Authorization"), Some("Basic root:Milvus"));
    assert_eq!(
        request.body.as_json().unwrap(),
        &json!({
            "dbName": "rag",
            "collectionName": "docs",
            "dimension": 4,
            "metricType": "L2",
            "primaryField": "id",
            "vectorField": "embedding"
        })
    );
}

#[tokio::test]
async fn zero_dimension_is_rejected() {
    let transport = Arc::new(FakeTransport::new());
    let store = setup(transport.clone());
    let err = store.create_collection(0, Metric::Cosine).await.unwrap_err();
    assert!(matches!(err, VectorHubError::Validation(_)));
    assert!(transport.requests().await.is_empty());
}

#[tokio::test]
async fn insert_sends_rows_and_returns_ids() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(
        200,
        json!({"code": 200, "data": {"insertCount": 2, "insertIds": [101, 102]}}),
    );
    let store = setup(transport.clone());

    let docs = vec![
        Document::new("a", vec![0.5, 0.25]),
        Document::new("b", vec![0.125, 0.75]).with_source("files", "b.md"),
    ];
    let ids = store.insert_data(docs).await.unwrap();
    assert_eq!(ids, vec!["101", "102"]);

    let request = transport.last_request().await.unwrap();
    assert_eq!(request.url, "http://milvus.local:19530/v1/vector/insert");
    let body = request.body.as_json().unwrap();
    assert_eq!(body["dbName"], "rag");
    assert_eq!(body["collectionName"], "docs");
    assert_eq!(body["data"][0]["embedding"], json!([0.5, 0.25]));
    assert!(body["data"][0].get("id").is_none());
    assert_eq!(body["data"][1]["sourceName"], "b.md");
    assert_eq!(transport.requests().await.len(), 1);
}

#[tokio::test]
async fn insert_fails_when_ids_are_missing() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(200, json!({"code": 200, "data": {"insertCount": 2}}));
    let store = setup(transport);

    let docs = vec![
        Document::new("a", vec![0.5, 0.25]),
        Document::new("b", vec![0.125, 0.75]),
    ];
    let err = store.insert_data(docs).await.unwrap_err();
    assert!(matches!(err, VectorHubError::Parsing(_)));
    let text = err.to_string();
    assert!(text.contains("0 ids for 2 documents"));
    assert!(text.contains("insertCount"));
}

#[tokio::test]
async fn numeric_ids_are_sent_as_int64() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(
        200,
        json!({"code": 200, "data": {"insertCount": 1, "insertIds": [42]}}),
    );
    let store = setup(transport.clone());

    let ids = store
        .insert_data(vec![Document::new("a", vec![0.5]).with_id("42")])
        .await
        .unwrap();
    assert_eq!(ids, vec!["42"]);
    let body = transport.last_request().await.unwrap().body;
    assert_eq!(body.as_json().unwrap()["data"][0]["id"], json!(42));
}

#[tokio::test]
async fn non_numeric_ids_are_rejected_before_sending() {
    let transport = Arc::new(FakeTransport::new());
    let store = setup(transport.clone());

    let err = store
        .insert_data(vec![Document::new("a", vec![0.5]).with_id("c-1")])
        .await
        .unwrap_err();
    assert!(matches!(err, VectorHubError::Validation(_)));
    assert!(transport.requests().await.is_empty());
}

#[tokio::test]
async fn l2_distances_score_closer_hits_higher() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(
        200,
        json!({"code": 200, "data": [
            {"id": 1, "distance": 0.0, "content": "exact"},
            {"id": 2, "distance": 1.0, "content": "far"}
        ]}),
    );
    let config = config().with_metric(Metric::Euclidean);
    let store = MilvusVectorStore::new(config, transport).unwrap();

    let results = store.similarity_search(&[0.5], 2).await.unwrap();
    assert_eq!(results[0].score, Some(1.0));
    assert_eq!(results[1].score, Some(0.5));
}

#[tokio::test]
async fn search_translates_hits_and_caps_at_k() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(
        200,
        json!({"code": 200, "data": [
            {"id": 1, "distance": 0.75, "content": "one", "embedding": [0.5], "chunkNumber": 0},
            {"id": 2, "distance": 0.5, "content": "two", "embedding": [0.5], "chunkNumber": 1},
            {"id": 3, "distance": 0.25, "content": "three", "embedding": [0.5], "chunkNumber": 2}
        ]}),
    );
    let store = setup(transport.clone());

    let results = store.similarity_search(&[0.5], 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].document.id.as_deref(), Some("1"));
    assert_eq!(results[0].document.content, "one");
    assert_eq!(results[0].score, Some(0.75));

    let request = transport.last_request().await.unwrap();
    let body = request.body.as_json().unwrap();
    assert_eq!(request.url, "http://milvus.local:19530/v1/vector/search");
    assert_eq!(body["limit"], 2);
    assert_eq!(body["vector"], json!([0.5]));
    assert!(body["outputFields"]
        .as_array()
        .unwrap()
        .contains(&json!("embedding")));
    assert!(body.get("filter").is_none());
}

#[tokio::test]
async fn search_on_empty_collection_returns_nothing() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(200, json!({"code": 200, "data": []}));
    let store = setup(transport);
    assert!(store.similarity_search(&[0.5], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn filtered_search_passes_expression() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(200, json!({"code": 200, "data": []}));
    let store = setup(transport.clone());

    let fields = vec!["content".to_string()];
    store
        .search_vector(&[0.5], 3, Some("chunkNumber > 1"), Some(fields.as_slice()))
        .await
        .unwrap();

    let body = transport.last_request().await.unwrap().body;
    let body = body.as_json().unwrap();
    assert_eq!(body["filter"], "chunkNumber > 1");
    assert_eq!(body["outputFields"], json!(["content"]));
}

#[tokio::test]
async fn non_2xx_uses_error_msg_and_keeps_body() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_response(HttpResponse::new(
        401,
        r#"{"error_msg":"auth check failure"}"#,
    ));
    let store = setup(transport);

    let err = store.drop_collection().await.unwrap_err();
    assert!(matches!(err, VectorHubError::Auth(_)));
    let text = err.to_string();
    assert!(text.contains("auth check failure"));
    assert!(text.contains(r#"{"error_msg":"auth check failure"}"#));
}

#[tokio::test]
async fn non_2xx_with_plain_body_is_still_reported() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_response(HttpResponse::new(502, "bad gateway"));
    let store = setup(transport);
    let err = store.similarity_search(&[0.5], 1).await.unwrap_err();
    assert!(matches!(err, VectorHubError::Backend(_)));
    assert!(err.to_string().contains("bad gateway"));
}

#[tokio::test]
async fn non_zero_code_under_2xx_is_a_failure() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(
        200,
        json!({"code": 1100, "message": "the length of vector is not matched"}),
    );
    let store = setup(transport);

    let err = store
        .insert_data(vec![sample_document()])
        .await
        .unwrap_err();
    assert!(matches!(err, VectorHubError::Backend(_)));
    assert!(err.to_string().contains("code 1100"));
    assert!(err.to_string().contains("the length of vector is not matched"));
}

#[tokio::test]
async fn collection_exists_uses_collection_list() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(200, json!({"code": 200, "data": ["docs", "other"]}));
    transport.push_json(200, json!({"code": 200, "data": []}));
    let store = setup(transport.clone());

    assert!(store.collection_exists("docs").await.unwrap());
    assert!(!store.collection_exists("docs").await.unwrap());

    let request = transport.last_request().await.unwrap();
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.url, "http://milvus.local:19530/v1/vector/collections");
    assert_eq!(request.body, Body::Empty);
}

#[tokio::test]
async fn drop_and_clean_request_shapes() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(200, json!({"code": 200, "data": {}}));
    transport.push_json(200, json!({"code": 200, "data": {}}));
    let store = setup(transport.clone());

    store.drop_collection().await.unwrap();
    store.clean_collection().await.unwrap();

    let requests = transport.requests().await;
    assert_eq!(
        requests[0].url,
        "http://milvus.local:19530/v1/vector/collections/drop"
    );
    assert_eq!(
        requests[0].body.as_json().unwrap(),
        &json!({"dbName": "rag", "collectionName": "docs"})
    );
    assert_eq!(requests[1].url, "http://milvus.local:19530/v1/vector/delete");
    assert_eq!(requests[1].body.as_json().unwrap()["filter"], "id >= 0");
}

#[tokio::test]
async fn query_and_get_return_raw_data() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(200, json!({"code": 200, "data": [{"id": 5, "content": "q"}]}));
    transport.push_json(200, json!({"code": 200, "data": [{"id": 5, "content": "g"}]}));
    let store = setup(transport.clone());

    let queried = store.query(Some("id > 0"), None, 10).await.unwrap();
    assert_eq!(queried[0]["content"], "q");
    let fetched = store.get_entity("5", None).await.unwrap();
    assert_eq!(fetched[0]["content"], "g");

    let requests = transport.requests().await;
    assert_eq!(requests[0].url, "http://milvus.local:19530/v1/vector/query");
    assert_eq!(requests[0].body.as_json().unwrap()["limit"], 10);
    assert_eq!(requests[1].url, "http://milvus.local:19530/v1/vector/get");
    assert_eq!(requests[1].body.as_json().unwrap()["id"], "5");
}

#[tokio::test]
async fn round_trip_dimension_four() {
    let transport = Arc::new(FakeTransport::new());
    transport.push_json(200, json!({"code": 200, "data": {}}));
    transport.push_json(
        200,
        json!({"code": 200, "data": {"insertCount": 1, "insertIds": [449]}}),
    );
    transport.push_json(
        200,
        json!({"code": 200, "data": [{
            "id": 449,
            "distance": 1.0,
            "content": "Milvus stores vectors",
            "sourceType": "files",
            "sourceName": "milvus.md",
            "hash": "h-9",
            "chunkNumber": 1,
            "embedding": [0.1, 0.2, 0.3, 0.4]
        }]}),
    );
    let store = setup(transport);

    store.create_collection(4, Metric::Cosine).await.unwrap();
    let ids = store.insert_data(vec![sample_document()]).await.unwrap();
    let results = store
        .similarity_search(&[0.1, 0.2, 0.3, 0.4], 1)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let expected = sample_document().with_id(ids[0].clone());
    assert_eq!(results[0].document, expected);
}

// ---------------------------------------------------------------------------
// Integration tests, require a live Milvus instance.
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore = "requires a live Milvus instance"]
async fn live_round_trip() {
    let config = MilvusConfig::from_env()
        .unwrap()
        .with_collection("vectorhub_it");
    let store = MilvusVectorStore::new(
        config,
        Arc::new(vectorhub_transport::HttpTransport::new()),
    )
    .unwrap();
    store.create_collection(4, Metric::Cosine).await.unwrap();
    store.insert_data(vec![sample_document()]).await.unwrap();
    let results = store
        .similarity_search(&[0.1, 0.2, 0.3, 0.4], 1)
        .await
        .unwrap();
    assert!(results.len() <= 1);
    store.drop_collection().await.unwrap();
}
