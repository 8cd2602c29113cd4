use std::path::Path;
use std::time::Duration;

use anyhow::Context;

use portico_common::{GlobalConfig, GlobalConfigPatch};
use portico_core::hash_api_key;

use crate::cli::Cli;
use crate::config_file;

/// Builds the process config. Merge order: CLI > ENV > config file >
/// defaults. clap already applies CLI > ENV per field; the file layer is
/// overlaid underneath.
pub(crate) fn load_config(cli: Cli) -> anyhow::Result<GlobalConfig> {
    let host = sanitize_optional_env_value(cli.host);
    let port = parse_u16_env_value(cli.port, "PORTICO_PORT")?;
    let api_key = sanitize_optional_env_value(cli.api_key);
    let jwt_secret = sanitize_optional_env_value(cli.jwt_secret);
    let rate_limit_window =
        parse_duration_env_value(cli.rate_limit_window, "PORTICO_RATE_LIMIT_WINDOW")?;
    let rate_limit_count = parse_u32_env_value(cli.rate_limit_count, "PORTICO_RATE_LIMIT_COUNT")?;
    let proxy = sanitize_optional_env_value(cli.proxy);
    let audit_url = sanitize_optional_env_value(cli.audit_url);
    let audit_index = sanitize_optional_env_value(cli.audit_index);

    let mut merged = GlobalConfigPatch::default();
    if let Some(path) = sanitize_optional_env_value(cli.config) {
        let file = config_file::load(Path::new(&path))?;
        merged.overlay(file.into_patch()?);
    }

    // Select secret sources:
    // - CLI/ENV plaintext wins and overwrites the file (hash stored)
    // - else, missing secrets are generated and printed once
    let mut api_key_hash_override = api_key.as_deref().map(hash_api_key);
    if api_key_hash_override.is_none() && merged.api_key_hash.is_none() {
        let key_plain = generate_secret();
        eprintln!("generated gateway api key: {key_plain}");
        api_key_hash_override = Some(hash_api_key(&key_plain));
    }
    let mut jwt_secret_override = jwt_secret;
    if jwt_secret_override.is_none() && merged.jwt_secret.is_none() {
        jwt_secret_override = Some(generate_secret());
        eprintln!("generated jwt signing secret");
    }

    merged.overlay(GlobalConfigPatch {
        host,
        port,
        api_key_hash: api_key_hash_override,
        jwt_secret: jwt_secret_override,
        rate_limit_window,
        rate_limit_count,
        proxy,
        audit_url,
        audit_index,
        services: None,
    });

    merged
        .into_config()
        .context("finalize merged global config")
}

fn sanitize_optional_env_value(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }
    // Some PaaS systems may inject unresolved placeholders like `${VAR}`.
    // Treat them as "not set" so startup doesn't fail on parsing.
    if trimmed.starts_with("${") && trimmed.ends_with('}') {
        return None;
    }
    Some(trimmed)
}

fn parse_u16_env_value(value: Option<String>, env_name: &str) -> anyhow::Result<Option<u16>> {
    let Some(raw) = sanitize_optional_env_value(value) else {
        return Ok(None);
    };
    let parsed = raw
        .parse::<u16>()
        .with_context(|| format!("invalid {env_name} value: {raw}"))?;
    Ok(Some(parsed))
}

fn parse_u32_env_value(value: Option<String>, env_name: &str) -> anyhow::Result<Option<u32>> {
    let Some(raw) = sanitize_optional_env_value(value) else {
        return Ok(None);
    };
    let parsed = raw
        .parse::<u32>()
        .with_context(|| format!("invalid {env_name} value: {raw}"))?;
    Ok(Some(parsed))
}

fn parse_duration_env_value(
    value: Option<String>,
    env_name: &str,
) -> anyhow::Result<Option<Duration>> {
    let Some(raw) = sanitize_optional_env_value(value) else {
        return Ok(None);
    };
    let parsed = humantime::parse_duration(&raw)
        .with_context(|| format!("invalid {env_name} value: {raw}"))?;
    Ok(Some(parsed))
}

fn generate_secret() -> String {
    // Random enough for a bootstrap secret; kept only in memory.
    uuid::Uuid::new_v4().to_string()
}
