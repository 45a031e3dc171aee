//! HTTP-level tests for the query executor router.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use query_executor::config::Config;
use query_executor::jobs::{ArxivPapersJob, JobHandler, JobRegistry};
use query_executor::models::{AppState, QueryRequest};
use query_executor::routes::create_router;
use query_executor::search::ArxivClient;
use query_executor::types::JobError;
use serde_json::{json, Value};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Echo;

#[async_trait]
impl JobHandler for Echo {
    async fn execute(&self, request: &QueryRequest) -> Result<Value, JobError> {
        Ok(json!({ "echo": request.params }))
    }
}

struct OutOfBounds;

#[async_trait]
impl JobHandler for OutOfBounds {
    async fn execute(&self, request: &QueryRequest) -> Result<Value, JobError> {
        let empty: Vec<Value> = Vec::new();
        Ok(empty[request.params.len()].clone())
    }
}

fn app_with(registry: JobRegistry) -> Router {
    create_router(AppState::new(Config::default(), registry))
}

fn app_with_origins(origins: &[&str]) -> Router {
    let mut config = Config::default();
    config.server.cors_allowed_origins = origins.iter().map(|o| o.to_string()).collect();
    create_router(AppState::new(config, JobRegistry::new()))
}

async fn allow_origin(app: Router, origin: &str) -> Option<String> {
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string())
}

/// Registry with the arXiv job pointed at an unreachable address plus a
/// local echo job, so nothing here leaves the machine.
fn test_app() -> Router {
    let client = ArxivClient::new()
        .expect("client")
        .with_base_url("http://127.0.0.1:9/api/query");

    let mut registry = JobRegistry::new();
    registry
        .register("arxiv.papers", ArxivPapersJob::new(client))
        .unwrap();
    registry.register("local.echo", Echo).unwrap();
    app_with(registry)
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: Router, uri: &str, body: Value) -> axum::response::Response {
    post_raw(app, uri, body.to_string()).await
}

async fn post_raw(app: Router, uri: &str, body: String) -> axum::response::Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let response = get(test_app(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn health_ok_with_empty_registry() {
    let response = get(app_with(JobRegistry::new()), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

// ---------------------------------------------------------------------------
// GET /sources
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sources_are_sorted() {
    let response = get(test_app(), "/sources").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"sources": ["arxiv.papers", "local.echo"]})
    );
}

// ---------------------------------------------------------------------------
// POST /query
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_unknown_source_is_400_with_valid_list() {
    let response = post_json(
        test_app(),
        "/query",
        json!({"source": "unknown.job", "params": {}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "Unknown source: unknown.job. Valid sources: ['arxiv.papers', 'local.echo']"
    );
}

#[tokio::test]
async fn query_success_echoes_source() {
    let response = post_json(
        test_app(),
        "/query",
        json!({"source": "local.echo", "params": {"x": [1, 2]}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"source": "local.echo", "result": {"echo": {"x": [1, 2]}}})
    );
}

#[tokio::test]
async fn query_arxiv_bad_params_is_500_naming_field() {
    let response = post_json(
        test_app(),
        "/query",
        json!({"source": "arxiv.papers", "params": {"max_results": 40000}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(detail.starts_with("Job execution failed: "), "{detail}");
    assert!(detail.contains("max_results"), "{detail}");
}

#[tokio::test]
async fn query_arxiv_upstream_failure_is_500() {
    let response = post_json(
        test_app(),
        "/query",
        json!({"source": "arxiv.papers", "params": {"query": "all:electron"}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Job execution failed: Upstream request failed"));
}

#[tokio::test]
async fn query_malformed_bodies_are_400() {
    let cases = vec![
        json!({"params": {}}).to_string(),
        json!({"source": "local.echo"}).to_string(),
        json!({"source": "local.echo", "params": [1, 2]}).to_string(),
        json!({"source": 7, "params": {}}).to_string(),
        "{not json".to_string(),
    ];

    for body in cases {
        let response = post_raw(test_app(), "/query", body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert!(body_json(response).await["detail"].is_string());
    }
}

#[tokio::test]
async fn query_empty_source_is_400() {
    let response = post_json(test_app(), "/query", json!({"source": "", "params": {}})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .contains("source"));
}

#[tokio::test]
async fn query_arxiv_end_to_end_against_mock() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/query")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("id_list".into(), "2401.00001".into()),
            mockito::Matcher::UrlEncoded("max_results".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/atom+xml")
        .with_body(
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
              <opensearch:totalResults>1</opensearch:totalResults>
              <entry>
                <id>http://arxiv.org/abs/2401.00001v1</id>
                <updated>2024-01-02T00:00:00Z</updated>
                <published>2024-01-01T00:00:00Z</published>
                <title>A Paper</title>
                <summary>Abstract.</summary>
                <author><name>First Author</name></author>
              </entry>
            </feed>"#,
        )
        .create_async()
        .await;

    let client = ArxivClient::new()
        .unwrap()
        .with_base_url(format!("{}/api/query", server.url()))
        .with_page_delay(Duration::ZERO);
    let mut registry = JobRegistry::new();
    registry
        .register("arxiv.papers", ArxivPapersJob::new(client))
        .unwrap();

    let response = post_json(
        app_with(registry),
        "/query",
        json!({"source": "arxiv.papers", "params": {"id_list": "2401.00001", "max_results": 1}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    mock.assert_async().await;

    let body = body_json(response).await;
    assert_eq!(body["source"], "arxiv.papers");
    assert_eq!(body["result"]["papers"][0]["title"], "A Paper");
    assert_eq!(body["result"]["id_list"], json!(["2401.00001"]));
}

#[tokio::test]
async fn query_handler_panic_is_500() {
    let mut registry = JobRegistry::new();
    registry.register("local.buggy", OutOfBounds).unwrap();

    let response = post_json(
        app_with(registry),
        "/query",
        json!({"source": "local.buggy", "params": {}}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(detail.starts_with("Job execution failed: "), "{detail}");
    assert!(detail.contains("index out of bounds"), "{detail}");
}

// ---------------------------------------------------------------------------
// CORS
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_wildcard_allows_any_origin() {
    assert_eq!(
        allow_origin(app_with_origins(&["*"]), "http://client.test").await.as_deref(),
        Some("*")
    );
}

#[tokio::test]
async fn cors_explicit_origins_are_enforced() {
    let origins = ["http://client.test", "http://admin.test"];
    assert_eq!(
        allow_origin(app_with_origins(&origins), "http://admin.test").await.as_deref(),
        Some("http://admin.test")
    );
    assert_eq!(
        allow_origin(app_with_origins(&origins), "http://evil.test").await,
        None
    );
}
