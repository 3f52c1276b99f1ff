//! Prints the user's most recent Last.fm plays as catalog tracks.
//!
//! Credentials come from the environment or a `.env` file; see
//! `core_runtime::config`. Logs go to stderr, the JSON document to stdout.
//! `LOG_LEVEL` and `LOG_FORMAT` (`pretty`, `json`, `compact`) adjust logging.

use anyhow::Context;
use bridge_desktop::ReqwestHttpClient;
use core_runtime::config::LastFmConfig;
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LogLevel, LoggingConfig};
use core_scrobble::{render_tracks_json, LastFmClient, RecentTracksImporter};
use std::sync::Arc;

/// Minimum spacing between Last.fm calls
const RATE_LIMIT_DELAY_MS: u64 = 200;

fn logging_config() -> anyhow::Result<LoggingConfig> {
    let mut config = LoggingConfig::default();

    if let Ok(level) = std::env::var("LOG_LEVEL") {
        let level: LogLevel = level.parse().context("invalid LOG_LEVEL")?;
        config = config.with_level(level);
    }
    if let Ok(format) = std::env::var("LOG_FORMAT") {
        let format: LogFormat = format.parse().context("invalid LOG_FORMAT")?;
        config = config.with_format(format);
    }

    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging(logging_config()?).context("failed to initialize logging")?;

    let config = LastFmConfig::from_env().context("failed to load Last.fm configuration")?;
    tracing::info!(
        username = %config.username,
        api_key = %redact_if_sensitive("api_key", &config.api_key),
        limit = config.import_limit,
        "Starting Last.fm import"
    );

    let http_client = ReqwestHttpClient::new().context("failed to create HTTP client")?;
    let client = LastFmClient::new(
        Arc::new(http_client),
        config.api_key.clone(),
        config.api_secret.clone(),
        RATE_LIMIT_DELAY_MS,
    );

    let importer = RecentTracksImporter::from_config(client, &config);
    let tracks = importer
        .run(config.import_limit)
        .await
        .context("Last.fm import failed")?;

    println!("{}", render_tracks_json(&tracks));
    Ok(())
}
