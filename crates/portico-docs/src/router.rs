use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::{Map, Value};
use tracing::{info, warn};

use portico_core::{UpstreamClient, UpstreamMethod, UpstreamRequest};

use crate::merge::merge_service_doc;
use crate::viewer::ViewerConfig;

/// A downstream service whose own swagger document is folded into the
/// aggregated one.
#[derive(Debug, Clone)]
pub struct ServiceDocSource {
    pub name: String,
    pub doc_url: String,
}

impl ServiceDocSource {
    pub fn new(name: &str, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            doc_url: format!("{}/swagger/doc.json", base_url.trim_end_matches('/')),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocFetchError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("document is not a json object")]
    Shape,
}

#[derive(Clone)]
pub struct DocsState {
    pub viewer: Arc<ViewerConfig>,
    /// The gateway's own document, parsed once at startup.
    pub gateway_doc: Arc<Map<String, Value>>,
    pub services: Arc<Vec<ServiceDocSource>>,
    pub client: Arc<dyn UpstreamClient>,
}

pub fn docs_router(state: DocsState) -> Router {
    Router::new()
        .route("/swagger/doc.json", get(merged_doc))
        .route("/swagger/swagger-initializer.js", get(initializer_script))
        .with_state(state)
}

/// Serves the aggregated document. A service whose document cannot be
/// fetched or parsed is skipped; the rest still merge.
async fn merged_doc(State(state): State<DocsState>) -> impl IntoResponse {
    let mut merged = (*state.gateway_doc).clone();
    for service in state.services.iter() {
        match fetch_service_doc(state.client.as_ref(), service).await {
            Ok(doc) => {
                info!(event = "service_doc_merged", service = %service.name);
                merge_service_doc(&mut merged, doc);
            }
            Err(err) => {
                warn!(
                    event = "service_doc_skipped",
                    service = %service.name,
                    url = %service.doc_url,
                    error = %err
                );
            }
        }
    }
    Json(Value::Object(merged))
}

async fn initializer_script(State(state): State<DocsState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        state.viewer.initializer_script(),
    )
}

async fn fetch_service_doc(
    client: &dyn UpstreamClient,
    source: &ServiceDocSource,
) -> Result<Map<String, Value>, DocFetchError> {
    let resp = client
        .send(UpstreamRequest {
            method: UpstreamMethod::Get,
            url: source.doc_url.clone(),
            headers: Vec::new(),
            body: None,
        })
        .await
        .map_err(|err| DocFetchError::Transport(err.to_string()))?;

    if resp.status != 200 {
        return Err(DocFetchError::Status(resp.status));
    }

    match serde_json::from_slice::<Value>(&resp.body)? {
        Value::Object(map) => Ok(map),
        _ => Err(DocFetchError::Shape),
    }
}
