pub mod auth;
pub mod core;
pub mod error;
pub mod handler;
pub mod rate_limit;
pub mod routes;
pub mod upstream_client;

pub use auth::{
    AuthContext, AuthError, AuthProvider, BEARER_PREFIX, Claims, JwtAuth, NoopAuth, TokenIssuer,
    ensure_bearer_prefix, hash_api_key, normalize_authorization,
};
pub use core::{Core, CoreState, ServiceLookup};
pub use error::ProxyError;
pub use rate_limit::RateLimiter;
pub use routes::{RoutePattern, ServiceEntry};
pub use upstream_client::{
    TransportErrorKind, UpstreamClient, UpstreamClientConfig, UpstreamFailure, UpstreamMethod,
    UpstreamRequest, UpstreamResponse, WreqUpstreamClient,
};
