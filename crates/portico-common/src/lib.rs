use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum GlobalConfigError {
    #[error("missing required global config field: {0}")]
    MissingField(&'static str),
}

/// One forwardable path on a downstream service. `{name}` segments match a
/// single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: String,
}

/// A downstream service the gateway fronts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// Final, merged global configuration used by the running process.
///
/// Merge order: CLI > ENV > config file > defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Stored as a hash (not plaintext).
    pub api_key_hash: String,
    /// HS256 signing secret for issued tokens.
    pub jwt_secret: String,
    pub rate_limit_window: Duration,
    pub rate_limit_count: u32,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
    /// Optional HTTP log store for audit entries. Unset disables shipping.
    pub audit_url: Option<String>,
    pub audit_index: String,
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Optional layer used for merging global config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key_hash: Option<String>,
    pub jwt_secret: Option<String>,
    pub rate_limit_window: Option<Duration>,
    pub rate_limit_count: Option<u32>,
    pub proxy: Option<String>,
    pub audit_url: Option<String>,
    pub audit_index: Option<String>,
    pub services: Option<BTreeMap<String, ServiceConfig>>,
}

impl GlobalConfigPatch {
    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.api_key_hash.is_some() {
            self.api_key_hash = other.api_key_hash;
        }
        if other.jwt_secret.is_some() {
            self.jwt_secret = other.jwt_secret;
        }
        if other.rate_limit_window.is_some() {
            self.rate_limit_window = other.rate_limit_window;
        }
        if other.rate_limit_count.is_some() {
            self.rate_limit_count = other.rate_limit_count;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.audit_url.is_some() {
            self.audit_url = other.audit_url;
        }
        if other.audit_index.is_some() {
            self.audit_index = other.audit_index;
        }
        if other.services.is_some() {
            self.services = other.services;
        }
    }

    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        Ok(GlobalConfig {
            host: self.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: self.port.unwrap_or(8080),
            api_key_hash: self
                .api_key_hash
                .ok_or(GlobalConfigError::MissingField("api_key_hash"))?,
            jwt_secret: self
                .jwt_secret
                .ok_or(GlobalConfigError::MissingField("jwt_secret"))?,
            rate_limit_window: self.rate_limit_window.unwrap_or(Duration::from_secs(60)),
            rate_limit_count: self.rate_limit_count.unwrap_or(60),
            proxy: self.proxy,
            audit_url: self.audit_url,
            audit_index: self
                .audit_index
                .unwrap_or_else(|| "gateway-logs".to_string()),
            services: self.services.unwrap_or_default(),
        })
    }
}

impl From<GlobalConfig> for GlobalConfigPatch {
    fn from(value: GlobalConfig) -> Self {
        Self {
            host: Some(value.host),
            port: Some(value.port),
            api_key_hash: Some(value.api_key_hash),
            jwt_secret: Some(value.jwt_secret),
            rate_limit_window: Some(value.rate_limit_window),
            rate_limit_count: Some(value.rate_limit_count),
            proxy: value.proxy,
            audit_url: value.audit_url,
            audit_index: Some(value.audit_index),
            services: Some(value.services),
        }
    }
}
