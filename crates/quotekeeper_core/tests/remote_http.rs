use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use quotekeeper_core::{
    CycleOutcome, HttpQuoteSource, KvRepository, MemoryKvRepository, QuoteStore, Reconciler,
    RemoteError, RemoteQuoteSource, QUOTES_KEY, SERVER_CATEGORY,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn posts() -> Json<Value> {
    Json(json!([
        {"userId": 1, "id": 1, "title": "first post", "body": "ignored"},
        {"userId": 1, "id": 2, "title": "second post", "body": "ignored"},
        {"userId": 1, "id": 3, "body": "no title"},
        {"userId": 1, "id": 4, "title": "fourth post"},
        {"userId": 1, "id": 5, "title": "fifth post"},
        {"userId": 1, "id": 6, "title": "sixth post"}
    ]))
}

async fn not_a_list() -> Json<Value> {
    Json(json!({"title": "single"}))
}

async fn unavailable() -> (StatusCode, &'static str) {
    (StatusCode::SERVICE_UNAVAILABLE, "down")
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!([{"title": "too late"}]))
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/posts", get(posts))
        .route("/object", get(not_a_list))
        .route("/down", get(unavailable))
        .route("/slow", get(slow));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn fetch_projects_first_items_into_server_quotes() {
    let base = spawn_server().await;
    let source = HttpQuoteSource::new(format!("{base}/posts"));

    let quotes = source.fetch().await.unwrap();

    let texts: Vec<&str> = quotes.iter().map(|quote| quote.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["first post", "second post", "fourth post", "fifth post"]
    );
    assert!(quotes.iter().all(|quote| quote.category == SERVER_CATEGORY));
}

#[tokio::test]
async fn limit_controls_how_many_items_are_considered() {
    let base = spawn_server().await;
    let source = HttpQuoteSource::new(format!("{base}/posts")).with_limit(2);

    assert_eq!(source.fetch().await.unwrap().len(), 2);
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let base = spawn_server().await;
    let source = HttpQuoteSource::new(format!("{base}/down"));

    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, RemoteError::Status(503)));
}

#[tokio::test]
async fn non_array_body_is_a_decode_failure() {
    let base = spawn_server().await;
    let source = HttpQuoteSource::new(format!("{base}/object"));

    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let source = HttpQuoteSource::new(format!("http://{addr}/posts"));

    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport(_)));
}

#[tokio::test]
async fn reconciler_times_out_slow_endpoint_without_mutation() {
    let base = spawn_server().await;
    let durable = MemoryKvRepository::new();
    durable
        .set(QUOTES_KEY, r#"[{"text":"mine","category":"Local"}]"#)
        .unwrap();
    let store = QuoteStore::open(durable, MemoryKvRepository::new());
    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(HttpQuoteSource::new(format!("{base}/slow"))),
        Duration::from_millis(100),
    );

    let report = reconciler.sync_now().await;

    assert!(matches!(report.outcome, CycleOutcome::FetchFailed(_)));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn reconciler_merges_http_batch_ahead_of_local_quotes() {
    let base = spawn_server().await;
    let durable = MemoryKvRepository::new();
    durable
        .set(
            QUOTES_KEY,
            r#"[{"text":"FIRST POST","category":"Local"},{"text":"mine","category":"Local"}]"#,
        )
        .unwrap();
    let store = QuoteStore::open(durable, MemoryKvRepository::new());
    let reconciler = Reconciler::new(
        store.clone(),
        Arc::new(HttpQuoteSource::new(format!("{base}/posts"))),
        Duration::from_secs(5),
    );

    let report = reconciler.sync_now().await;

    assert!(matches!(report.outcome, CycleOutcome::MergeApplied { .. }));
    let quotes = store.quotes();
    assert_eq!(quotes.len(), 5);
    assert_eq!(quotes[0].text, "first post");
    assert_eq!(quotes[0].category, SERVER_CATEGORY);
    assert_eq!(quotes[4].text, "mine");
}
