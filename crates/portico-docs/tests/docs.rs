use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use serde_json::{Value, json};
use tower::ServiceExt;

use portico_core::{
    TransportErrorKind, UpstreamClient, UpstreamFailure, UpstreamRequest, UpstreamResponse,
};
use portico_docs::{DocsState, ServiceDocSource, ViewerConfig, docs_router};

/// Serves canned documents by URL; unknown URLs fail like a dead upstream.
struct CannedDocs {
    docs: HashMap<String, (u16, Bytes)>,
}

impl UpstreamClient for CannedDocs {
    fn send<'a>(
        &'a self,
        req: UpstreamRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamResponse, UpstreamFailure>> + Send + 'a>> {
        let result = match self.docs.get(&req.url) {
            Some((status, body)) => Ok(UpstreamResponse {
                status: *status,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body: body.clone(),
            }),
            None => Err(UpstreamFailure {
                kind: TransportErrorKind::Connect,
                message: "connection refused".to_string(),
            }),
        };
        Box::pin(std::future::ready(result))
    }
}

fn gateway_doc() -> serde_json::Map<String, Value> {
    match json!({
        "swagger": "2.0",
        "paths": { "/auth/token": { "post": { "summary": "token" } } },
        "definitions": { "TokenRequest": { "type": "object" } }
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn state_with(docs: HashMap<String, (u16, Bytes)>, services: Vec<ServiceDocSource>) -> DocsState {
    DocsState {
        viewer: Arc::new(ViewerConfig::default()),
        gateway_doc: Arc::new(gateway_doc()),
        services: Arc::new(services),
        client: Arc::new(CannedDocs { docs }),
    }
}

async fn get_json(state: DocsState, path: &str) -> (StatusCode, Value) {
    let response = docs_router(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn merged_doc_combines_gateway_and_service_paths() {
    let mut docs = HashMap::new();
    docs.insert(
        "http://driver.internal:8081/swagger/doc.json".to_string(),
        (
            200,
            Bytes::from(
                json!({
                    "paths": { "/drivers": { "get": { "summary": "list" } } },
                    "definitions": { "Driver": { "type": "object" } }
                })
                .to_string(),
            ),
        ),
    );
    let state = state_with(
        docs,
        vec![ServiceDocSource::new(
            "driver",
            "http://driver.internal:8081/",
        )],
    );

    let (status, doc) = get_json(state, "/swagger/doc.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["paths"]["/auth/token"]["post"]["summary"], "token");
    assert_eq!(
        doc["paths"]["/drivers"]["get"]["security"],
        json!([{ "BearerAuth": [] }])
    );
    assert_eq!(doc["definitions"]["Driver"]["type"], "object");
    assert_eq!(doc["definitions"]["TokenRequest"]["type"], "object");
}

#[tokio::test]
async fn unreachable_service_is_skipped() {
    let state = state_with(
        HashMap::new(),
        vec![ServiceDocSource::new("driver", "http://driver.internal:8081")],
    );

    let (status, doc) = get_json(state, "/swagger/doc.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["paths"]["/auth/token"]["post"]["summary"], "token");
    assert!(doc["paths"].get("/drivers").is_none());
}

#[tokio::test]
async fn malformed_service_doc_is_skipped() {
    let mut docs = HashMap::new();
    docs.insert(
        "http://driver.internal:8081/swagger/doc.json".to_string(),
        (200, Bytes::from_static(b"<html>not json</html>")),
    );
    docs.insert(
        "http://billing.internal:8082/swagger/doc.json".to_string(),
        (
            200,
            Bytes::from(
                json!({ "paths": { "/invoices": { "get": {} } } }).to_string(),
            ),
        ),
    );
    let state = state_with(
        docs,
        vec![
            ServiceDocSource::new("driver", "http://driver.internal:8081"),
            ServiceDocSource::new("billing", "http://billing.internal:8082"),
        ],
    );

    let (_, doc) = get_json(state, "/swagger/doc.json").await;
    assert!(doc["paths"].get("/drivers").is_none());
    assert!(doc["paths"].get("/invoices").is_some());
}

#[tokio::test]
async fn error_status_from_service_is_skipped() {
    let mut docs = HashMap::new();
    docs.insert(
        "http://driver.internal:8081/swagger/doc.json".to_string(),
        (500, Bytes::from_static(b"boom")),
    );
    let state = state_with(
        docs,
        vec![ServiceDocSource::new("driver", "http://driver.internal:8081")],
    );

    let (status, doc) = get_json(state, "/swagger/doc.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/drivers").is_none());
}

#[tokio::test]
async fn initializer_script_is_served_as_javascript() {
    let state = state_with(HashMap::new(), Vec::new());
    let response = docs_router(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/swagger/swagger-initializer.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/javascript"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let script = String::from_utf8(body.to_vec()).unwrap();
    assert!(script.contains(r#"url: "/swagger/doc.json","#));
    assert!(script.contains("requestInterceptor"));
    assert!(script.contains("window.ui = ui;"));
}
