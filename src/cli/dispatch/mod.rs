use crate::{
    cli::actions::Action,
    collectors::{
        all_schemas, config::Configuration, connection::redact, error::ConfigError,
        filter::FilterFile,
    },
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};
use tracing::info;

/// Resolve the command line into a validated [`Action`].
///
/// # Errors
///
/// Returns an error for an unparsable URI, an unreadable or malformed filter file or an
/// unusable telemetry path.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // None means auto-detect
    let listen = matches.get_one::<String>("listen").cloned();

    let telemetry_path = matches
        .get_one::<String>("telemetry-path")
        .cloned()
        .unwrap_or_else(|| "/metrics".to_string());

    validate_telemetry_path(&telemetry_path)?;

    let uri = matches
        .get_one::<String>("uri")
        .ok_or_else(|| anyhow!("URI is required. Please provide it using the --uri flag."))?;

    let filters = match matches.get_one::<PathBuf>("filters") {
        Some(path) => {
            let filters = FilterFile::load(path)
                .with_context(|| format!("Failed to load filters from {}", path.display()))?;
            info!(path = %path.display(), "loaded query filters");
            filters
        }
        None => FilterFile::new(),
    };

    let timeout = matches.get_one::<u64>("timeout").copied().unwrap_or(30);

    let config = Configuration::new(uri)?
        .with_credentials(
            matches.get_one::<String>("user").cloned(),
            matches
                .get_one::<String>("password")
                .map(|p| SecretString::from(p.clone())),
        )
        .with_insecure(matches.get_one::<bool>("insecure").copied().unwrap_or(true))
        .with_timeout(Duration::from_secs(timeout))
        .with_filters(filters)
        .with_enabled(&get_enabled_families(matches))
        .with_clickhouse_only(matches.get_flag("clickhouse-only"));

    info!(uri = %redact(&config.uri), "scraping");

    Ok(Action::Run {
        port,
        listen,
        telemetry_path,
        config: Box::new(config),
    })
}

/// The telemetry path becomes an axum route next to `/` and `/health`, so it must be a
/// plain absolute path without route captures or wildcards.
fn validate_telemetry_path(path: &str) -> Result<(), ConfigError> {
    let reserved = path == "/" || path == "/health";
    let route_syntax = path.contains([':', '*', '{', '}']);

    if !path.starts_with('/') || reserved || route_syntax {
        return Err(ConfigError::TelemetryPath(path.to_string()));
    }

    Ok(())
}

#[must_use]
pub fn get_enabled_families(matches: &ArgMatches) -> Vec<String> {
    all_schemas()
        .into_iter()
        .filter(|schema| {
            let enable_flag = format!("collector.{}", schema.name);
            let disable_flag = format!("no-collector.{}", schema.name);

            // If explicitly disabled, skip it
            if matches.get_flag(&disable_flag) {
                return false;
            }

            // If explicitly enabled, include it
            if matches.get_flag(&enable_flag) {
                return true;
            }

            schema.enabled_by_default
        })
        .map(|schema| schema.name.to_string())
        .collect()
}
