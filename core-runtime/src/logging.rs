//! Structured logging setup.
//!
//! Library crates only emit `tracing` events. A binary calls [`init_logging`]
//! once; events then go to **stderr** in the chosen format, which keeps
//! stdout free for the importer's JSON output.
//!
//! ```ignore
//! init_logging(LoggingConfig::default().with_level(LogLevel::Debug))?;
//! ```

use crate::error::{Error, Result};
use std::io;
use std::str::FromStr;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Crates whose events follow the configured level; everything else is held at `warn`.
const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_library",
    "core_scrobble",
    "bridge_desktop",
    "import_lastfm_tracks",
];

const QUIET_TARGETS: &[&str] = &["h2", "hyper", "reqwest", "rustls", "sqlx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human oriented
    Pretty,
    /// One JSON object per event
    Json,
    /// One line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(Error::Config(format!("Unknown log format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(Error::Config(format!("Unknown log level: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for the workspace crates
    pub level: LogLevel,
    /// Full `EnvFilter` directive string; replaces the level-based default
    pub filter: Option<String>,
    /// Print the event target (module path)
    pub display_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            filter: None,
            display_target: true,
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }
}

/// Installs the global subscriber.
///
/// # Errors
/// `Config` if the filter does not parse or a subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;

    let output = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_writer(io::stderr);
    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => output.pretty().boxed(),
        LogFormat::Json => output.json().flatten_event(true).boxed(),
        LogFormat::Compact => output.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            let level = config.level.directive();
            WORKSPACE_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, level))
                .chain(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)))
                .collect::<Vec<_>>()
                .join(",")
        }
    };

    EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("Invalid log filter '{}': {}", directives, e)))
}

/// Replaces the value of credential-like fields before logging.
///
/// ```ignore
/// info!(api_key = %redact_if_sensitive("api_key", &key), "Loaded credentials");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    const SENSITIVE: &[&str] = &[
        "token",
        "session",
        "password",
        "secret",
        "api_key",
        "api_sig",
        "authorization",
    ];

    let field = field_name.to_ascii_lowercase();
    if SENSITIVE.iter().any(|marker| field.contains(marker)) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace_and_quiets_dependencies() {
        let filter = build_filter(&LoggingConfig::default().with_level(LogLevel::Debug))
            .unwrap()
            .to_string();

        for target in WORKSPACE_TARGETS {
            assert!(filter.contains(&format!("{}=debug", target)), "{}", filter);
        }
        assert!(filter.contains("sqlx=warn"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn test_custom_filter_replaces_default() {
        let config = LoggingConfig::default()
            .with_level(LogLevel::Error)
            .with_filter("core_scrobble=trace");
        let filter = build_filter(&config).unwrap().to_string();

        assert!(filter.contains("core_scrobble=trace"));
        assert!(!filter.contains("core_library"));
    }

    #[test]
    fn test_level_and_format_parsing() {
        assert_eq!(" Warning ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert!(matches!("verbose".parse::<LogLevel>(), Err(Error::Config(_))));

        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_redaction_matches_substrings() {
        for field in ["LAST_FM_API_SECRET", "session_key", "password_hash", "authToken"] {
            assert_eq!(redact_if_sensitive(field, "value"), "[REDACTED]", "{}", field);
        }
        assert_eq!(redact_if_sensitive("import_limit", "10"), "10");
    }
}
