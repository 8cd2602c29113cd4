use std::sync::Arc;

use axum::Router;
use axum::routing::any;
use portico_audit::SharedAuditSink;

use crate::auth::AuthProvider;
use crate::handler::proxy_handler;
use crate::rate_limit::RateLimiter;
use crate::routes::ServiceEntry;
use crate::upstream_client::UpstreamClient;

pub type ServiceLookup = Arc<dyn Fn(&str) -> Option<Arc<ServiceEntry>> + Send + Sync>;

pub struct CoreState {
    pub lookup: ServiceLookup,
    pub auth: Arc<dyn AuthProvider>,
    pub limiter: RateLimiter,
    pub client: Arc<dyn UpstreamClient>,
    pub audit: SharedAuditSink,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(
        lookup: ServiceLookup,
        auth: Arc<dyn AuthProvider>,
        limiter: RateLimiter,
        client: Arc<dyn UpstreamClient>,
        audit: SharedAuditSink,
    ) -> Self {
        Self {
            state: Arc::new(CoreState {
                lookup,
                auth,
                limiter,
                client,
                audit,
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/{service}/{*path}", any(proxy_handler))
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }
}
