use std::collections::HashMap;
use std::sync::Arc;

mod bootstrap;
mod cli;
mod config_file;
mod docs_ui;
mod token;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing::info;

use portico_audit::{
    AuditBus, AuditBusConfig, BusAuditSink, HttpAuditShipper, NoopAuditSink, SharedAuditSink,
};
use portico_common::GlobalConfig;
use portico_core::{
    Core, JwtAuth, RateLimiter, ServiceEntry, ServiceLookup, TokenIssuer, UpstreamClient,
    UpstreamClientConfig, WreqUpstreamClient,
};
use portico_docs::{DocsState, ServiceDocSource, ViewerConfig, docs_router};

use crate::cli::Cli;

/// The gateway's own document; service documents are merged in per request.
const GATEWAY_DOC: &str = include_str!("../assets/doc.json");

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("portico failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = bootstrap::load_config(cli)?;
    info!(
        host = %config.host,
        port = config.port,
        services = config.services.len(),
        audit = config.audit_url.is_some(),
        "config loaded"
    );

    let services: HashMap<String, Arc<ServiceEntry>> = config
        .services
        .iter()
        .map(|(name, svc)| (name.clone(), Arc::new(ServiceEntry::from_config(name, svc))))
        .collect();
    // Config order (sorted by name) keeps doc merging deterministic.
    let doc_sources: Vec<ServiceDocSource> = config
        .services
        .iter()
        .map(|(name, svc)| ServiceDocSource::new(name, &svc.base_url))
        .collect();
    for (name, svc) in &config.services {
        info!(
            event = "service_registered",
            service = %name,
            base_url = %svc.base_url,
            routes = svc.routes.len()
        );
    }

    let lookup: ServiceLookup = {
        let services = services.clone();
        Arc::new(move |name| services.get(name).cloned())
    };

    let client: Arc<dyn UpstreamClient> = Arc::new(
        WreqUpstreamClient::new(UpstreamClientConfig::from_global(&config))
            .context("build upstream client")?,
    );

    let (audit, _audit_bus) = audit_sink(&config)?;

    let issuer = Arc::new(TokenIssuer::new(
        config.api_key_hash.clone(),
        &config.jwt_secret,
    ));
    let core = Core::new(
        lookup,
        Arc::new(JwtAuth::new(&config.jwt_secret)),
        RateLimiter::new(config.rate_limit_window, config.rate_limit_count),
        client.clone(),
        audit,
    );

    let gateway_doc = match serde_json::from_str::<Value>(GATEWAY_DOC)
        .context("parse embedded gateway doc")?
    {
        Value::Object(map) => map,
        _ => anyhow::bail!("embedded gateway doc is not a json object"),
    };
    let docs = DocsState {
        viewer: Arc::new(ViewerConfig::default()),
        gateway_doc: Arc::new(gateway_doc),
        services: Arc::new(doc_sources),
        client,
    };

    let app = axum::Router::new()
        .merge(token::token_router(issuer))
        .merge(docs_router(docs))
        .route("/swagger", axum::routing::get(docs_ui::ui_fallback))
        .route("/swagger/", axum::routing::get(docs_ui::ui_fallback))
        .route("/swagger/{*path}", axum::routing::get(docs_ui::ui_fallback))
        .merge(core.router());

    serve(app, &format!("{}:{}", config.host, config.port)).await
}

fn audit_sink(config: &GlobalConfig) -> anyhow::Result<(SharedAuditSink, Option<AuditBus>)> {
    let Some(url) = config.audit_url.as_deref() else {
        return Ok((Arc::new(NoopAuditSink), None));
    };
    let shipper = Arc::new(
        HttpAuditShipper::new(url, &config.audit_index).context("build audit shipper")?,
    );
    let bus = AuditBus::spawn(shipper, AuditBusConfig::default());
    let sink: SharedAuditSink = Arc::new(BusAuditSink::new(&bus));
    info!(event = "audit_enabled", url = %url, index = %config.audit_index);
    Ok((sink, Some(bus)))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("portico=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(app: axum::Router, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(addr = %bind, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
