use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use portico_common::{GlobalConfigPatch, ServiceConfig};
use portico_core::hash_api_key;

/// On-disk YAML layer. Every scalar is optional so CLI/ENV can carry a
/// minimal deployment; the service table is file-borne.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    /// Plaintext in the file; only the hash is kept in memory.
    pub(crate) api_key: Option<String>,
    pub(crate) jwt_secret: Option<String>,
    pub(crate) rate_limit_window: Option<String>,
    pub(crate) rate_limit_count: Option<u32>,
    pub(crate) proxy: Option<String>,
    pub(crate) audit_url: Option<String>,
    pub(crate) audit_index: Option<String>,
    #[serde(default)]
    pub(crate) services: BTreeMap<String, ServiceConfig>,
}

pub(crate) fn load(path: &Path) -> anyhow::Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}

impl FileConfig {
    pub(crate) fn into_patch(self) -> anyhow::Result<GlobalConfigPatch> {
        let rate_limit_window = self
            .rate_limit_window
            .as_deref()
            .map(humantime::parse_duration)
            .transpose()
            .context("invalid rate_limit_window in config file")?;

        Ok(GlobalConfigPatch {
            host: self.host,
            port: self.port,
            api_key_hash: self.api_key.as_deref().map(hash_api_key),
            jwt_secret: self.jwt_secret,
            rate_limit_window,
            rate_limit_count: self.rate_limit_count,
            proxy: self.proxy,
            audit_url: self.audit_url,
            audit_index: self.audit_index,
            services: if self.services.is_empty() {
                None
            } else {
                Some(self.services)
            },
        })
    }
}
