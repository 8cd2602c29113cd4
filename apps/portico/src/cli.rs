use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "portico",
    version,
    about = "Lightweight API gateway with aggregated interactive API docs"
)]
pub(crate) struct Cli {
    /// Path to the YAML config file carrying the service table.
    #[arg(long, env = "PORTICO_CONFIG")]
    pub(crate) config: Option<String>,

    /// Bind host.
    #[arg(long, env = "PORTICO_HOST")]
    pub(crate) host: Option<String>,

    /// Bind port.
    #[arg(long, env = "PORTICO_PORT")]
    pub(crate) port: Option<String>,

    /// Gateway API key (plaintext). Stored as hash in memory.
    #[arg(long, env = "PORTICO_API_KEY")]
    pub(crate) api_key: Option<String>,

    /// HS256 signing secret for issued tokens.
    #[arg(long, env = "PORTICO_JWT_SECRET")]
    pub(crate) jwt_secret: Option<String>,

    /// Rate-limit window, e.g. "60s" or "1m".
    #[arg(long, env = "PORTICO_RATE_LIMIT_WINDOW")]
    pub(crate) rate_limit_window: Option<String>,

    /// Requests allowed per window per (service, client ip).
    #[arg(long, env = "PORTICO_RATE_LIMIT_COUNT")]
    pub(crate) rate_limit_count: Option<String>,

    /// Optional outbound proxy for upstream requests.
    #[arg(long, env = "PORTICO_PROXY")]
    pub(crate) proxy: Option<String>,

    /// Optional HTTP log store audit entries are shipped to.
    #[arg(long, env = "PORTICO_AUDIT_URL")]
    pub(crate) audit_url: Option<String>,

    /// Index name for shipped audit entries.
    #[arg(long, env = "PORTICO_AUDIT_INDEX")]
    pub(crate) audit_index: Option<String>,
}
