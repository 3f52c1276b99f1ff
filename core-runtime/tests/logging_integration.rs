//! Integration tests for logging system

use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LogLevel, LoggingConfig};

#[test]
fn test_logging_initialization_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).is_ok());
    tracing::info!(target: "core_runtime", "logging initialized");

    // A second global subscriber cannot be installed
    assert!(init_logging(config).is_err());
}

#[test]
fn test_invalid_filter_is_rejected() {
    let config = LoggingConfig::default().with_filter("core_library=[[[");
    assert!(init_logging(config).is_err());
}

#[test]
fn test_credential_fields_are_redacted() {
    assert_eq!(redact_if_sensitive("api_key", "abcdef"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("API_SECRET", "abcdef"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("api_sig", "abcdef"), "[REDACTED]");

    assert_eq!(redact_if_sensitive("title", "Song Name"), "Song Name");
    assert_eq!(redact_if_sensitive("artist", "Boards of Canada"), "Boards of Canada");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_target(false);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.display_target);
    assert!(config.filter.is_none());
}
