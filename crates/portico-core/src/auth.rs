use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, StatusCode};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// The bearer token convention: `Authorization: Bearer <token>`.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Issued tokens expire after this long.
pub const TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Returns the prefixed value when `value` does not already carry the
/// `Bearer ` prefix, `None` when it is fine as-is.
///
/// An empty value is prefixed too, yielding `"Bearer "` with no token; the
/// downstream verifier rejects it.
pub fn ensure_bearer_prefix(value: &str) -> Option<String> {
    if value.starts_with(BEARER_PREFIX) {
        return None;
    }
    Some(format!("{BEARER_PREFIX}{value}"))
}

/// Rewrites the `Authorization` header in place to carry the `Bearer `
/// prefix. Requests without the header, or already prefixed, are left
/// untouched. Idempotent; no other header is mutated.
pub fn normalize_authorization(headers: &mut HeaderMap) {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return;
    };
    let Ok(value) = value.to_str() else {
        return;
    };
    let Some(prefixed) = ensure_bearer_prefix(value) else {
        return;
    };
    if let Ok(prefixed) = HeaderValue::from_str(&prefixed) {
        headers.insert(AUTHORIZATION, prefixed);
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub subject: Option<String>,
}

#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub body: Bytes,
}

impl AuthError {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

pub trait AuthProvider: Send + Sync {
    #[allow(clippy::result_large_err)]
    fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError>;
}

#[derive(Debug, Default)]
pub struct NoopAuth;

impl AuthProvider for NoopAuth {
    fn authenticate(&self, _headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        Ok(AuthContext::default())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iat: u64,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

/// Verifies `Authorization: Bearer <jwt>` headers on proxied requests.
pub struct JwtAuth {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl AuthProvider for JwtAuth {
    fn authenticate(&self, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
        let token = extract_bearer_token(headers)
            .ok_or_else(|| AuthError::new(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

        let data = jsonwebtoken::decode::<Claims>(&token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::new(StatusCode::FORBIDDEN, "invalid token"))?;

        Ok(AuthContext {
            subject: data.claims.sub,
        })
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let auth = auth.trim();
    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

pub fn hash_api_key(key: &str) -> String {
    blake3::hash(key.as_bytes()).to_hex().to_string()
}

/// Trades the gateway API key for a signed short-lived token.
pub struct TokenIssuer {
    api_key_hash: String,
    encoding: EncodingKey,
}

impl TokenIssuer {
    pub fn new(api_key_hash: String, secret: &str) -> Self {
        Self {
            api_key_hash,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    #[allow(clippy::result_large_err)]
    pub fn issue(&self, api_key: &str) -> Result<String, AuthError> {
        if hash_api_key(api_key) != self.api_key_hash {
            return Err(AuthError::new(StatusCode::UNAUTHORIZED, "invalid api key"));
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|err| AuthError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?
            .as_secs();
        let claims = Claims {
            iat: now,
            exp: now + TOKEN_TTL.as_secs(),
            sub: None,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
    }
}
