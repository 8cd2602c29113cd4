use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use portico_core::TokenIssuer;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequest {
    pub(crate) api_key: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct TokenResponse {
    pub(crate) token: String,
}

pub(crate) fn token_router(issuer: Arc<TokenIssuer>) -> Router {
    Router::new()
        .route("/auth/token", post(issue_token))
        .with_state(issuer)
}

async fn issue_token(
    State(issuer): State<Arc<TokenIssuer>>,
    Json(req): Json<TokenRequest>,
) -> Response {
    match issuer.issue(&req.api_key) {
        Ok(token) => {
            info!(event = "token_issued");
            Json(TokenResponse { token }).into_response()
        }
        Err(err) => (err.status, err.body).into_response(),
    }
}
