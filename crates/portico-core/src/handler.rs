use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use axum::response::Response;
use bytes::Bytes;
use http::StatusCode;
use http::header::USER_AGENT;
use portico_audit::{AuditEntry, truncate_body};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthError, normalize_authorization};
use crate::core::CoreState;
use crate::error::ProxyError;
use crate::upstream_client::{UpstreamMethod, UpstreamRequest, UpstreamResponse};

/// Headers owned by each hop; never copied onto the upstream request or back
/// onto the downstream response.
const HOP_HEADERS: &[&str] = &["connection", "host", "content-length", "transfer-encoding"];

pub async fn proxy_handler(
    State(state): State<Arc<CoreState>>,
    Path((service, path)): Path<(String, String)>,
    method: Method,
    mut headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    let request_path = format!("/{}", path.trim_start_matches('/'));
    let meta = RequestMeta {
        started_at: Instant::now(),
        timestamp: OffsetDateTime::now_utc(),
        trace_id: Uuid::new_v4().to_string(),
        method: method.to_string(),
        path: uri.path().to_string(),
        client_ip: client_ip(&headers),
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        request_body: body.clone(),
    };

    // The gateway is the outgoing boundary for viewer traffic: enforce the
    // bearer convention once, before verification and before the forward.
    normalize_authorization(&mut headers);

    info!(
        event = "downstream_received",
        trace_id = %meta.trace_id,
        service = %service,
        method = %method,
        path = %request_path,
        client_ip = %meta.client_ip
    );

    let Some(target) = (state.lookup)(service.as_str()) else {
        return error_response(&state, &meta, ProxyError::not_found("unknown service"));
    };

    if let Err(err) = state.auth.authenticate(&headers) {
        return auth_error_response(&state, &meta, err);
    }

    if !state.limiter.allow(&service, &meta.client_ip) {
        return error_response(
            &state,
            &meta,
            ProxyError::too_many_requests("rate limit exceeded"),
        );
    }

    if !target.allows(&request_path) {
        return error_response(&state, &meta, ProxyError::not_found("unknown route"));
    }

    let Some(upstream_method) = UpstreamMethod::from_http(&method) else {
        return error_response(
            &state,
            &meta,
            ProxyError::method_not_allowed("unsupported method"),
        );
    };

    let url = match uri.query() {
        Some(query) => format!("{}{}?{}", target.base_url, request_path, query),
        None => format!("{}{}", target.base_url, request_path),
    };
    info!(
        event = "upstream_forwarded",
        trace_id = %meta.trace_id,
        service = %service,
        url = %url
    );

    let result = state
        .client
        .send(UpstreamRequest {
            method: upstream_method,
            url,
            headers: forwardable_headers(&headers),
            body: if body.is_empty() { None } else { Some(body) },
        })
        .await;

    match result {
        Ok(upstream) => {
            state.audit.record(meta.entry(upstream.status, &upstream.body));
            info!(
                event = "downstream_responded",
                trace_id = %meta.trace_id,
                service = %service,
                status = upstream.status,
                elapsed_ms = meta.started_at.elapsed().as_millis() as u64
            );
            upstream_response(upstream, &meta.trace_id)
        }
        Err(err) => {
            warn!(
                event = "upstream_failed",
                trace_id = %meta.trace_id,
                service = %service,
                error = %err
            );
            error_response(&state, &meta, ProxyError::bad_gateway("upstream unreachable"))
        }
    }
}

struct RequestMeta {
    started_at: Instant,
    timestamp: OffsetDateTime,
    trace_id: String,
    method: String,
    path: String,
    client_ip: String,
    user_agent: String,
    request_body: Bytes,
}

impl RequestMeta {
    fn entry(&self, status: u16, response_body: &[u8]) -> AuditEntry {
        AuditEntry {
            timestamp: self.timestamp,
            trace_id: self.trace_id.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            status_code: status,
            client_ip: self.client_ip.clone(),
            user_agent: self.user_agent.clone(),
            request_body: truncate_body(&self.request_body),
            response_body: truncate_body(response_body),
            latency_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}

fn upstream_response(upstream: UpstreamResponse, trace_id: &str) -> Response {
    let mut resp = Response::new(Body::from(upstream.body));
    *resp.status_mut() =
        StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    for (name, value) in &upstream.headers {
        if is_hop_header(name) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(value),
        ) {
            resp.headers_mut().insert(name, value);
        }
    }
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        resp.headers_mut().insert("x-portico-request-id", value);
    }
    resp
}

fn error_response(state: &CoreState, meta: &RequestMeta, err: ProxyError) -> Response {
    warn!(
        event = "downstream_responded",
        trace_id = %meta.trace_id,
        status = err.status.as_u16(),
        elapsed_ms = meta.started_at.elapsed().as_millis() as u64
    );
    state.audit.record(meta.entry(err.status.as_u16(), &err.body));
    let mut resp = Response::new(Body::from(err.body));
    *resp.status_mut() = err.status;
    resp
}

fn auth_error_response(state: &CoreState, meta: &RequestMeta, err: AuthError) -> Response {
    warn!(
        event = "downstream_responded",
        trace_id = %meta.trace_id,
        status = err.status.as_u16(),
        elapsed_ms = meta.started_at.elapsed().as_millis() as u64
    );
    state.audit.record(meta.entry(err.status.as_u16(), &err.body));
    let mut resp = Response::new(Body::from(err.body));
    *resp.status_mut() = err.status;
    resp
}

fn forwardable_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (name, value) in headers.iter() {
        if is_hop_header(name.as_str()) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            out.push((name.as_str().to_string(), value.to_string()));
        }
    }
    out
}

fn is_hop_header(name: &str) -> bool {
    HOP_HEADERS.iter().any(|hop| name.eq_ignore_ascii_case(hop))
}

fn client_ip(headers: &HeaderMap) -> String {
    if let Some(value) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        && let Some(first) = value.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    if let Some(value) = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
    {
        let value = value.trim();
        if !value.is_empty() {
            return value.to_string();
        }
    }
    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_wins_over_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("10.1.2.3, 172.16.0.1"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.0.9"));
        assert_eq!(client_ip(&headers), "10.1.2.3");
    }

    #[test]
    fn real_ip_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.0.9"));
        assert_eq!(client_ip(&headers), "192.168.0.9");
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn hop_headers_are_not_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("gateway.local"));
        headers.insert("content-length", HeaderValue::from_static("12"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let forwarded = forwardable_headers(&headers);
        let names: Vec<&str> = forwarded.iter().map(|(name, _)| name.as_str()).collect();
        assert!(names.contains(&"authorization"));
        assert!(names.contains(&"accept"));
        assert!(!names.contains(&"host"));
        assert!(!names.contains(&"content-length"));
    }
}
