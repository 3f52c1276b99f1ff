//! # Importer Configuration
//!
//! Settings for the Last.fm recent-tracks importer.
//!
//! ## Overview
//!
//! Credentials are supplied out of band through environment variables, with
//! an optional `.env` file in the working directory:
//!
//! | Variable | Required | Meaning |
//! |----------|----------|---------|
//! | `LAST_FM_API_KEY` | yes | API key |
//! | `LAST_FM_API_SECRET` | yes | API shared secret, used to sign calls |
//! | `LAST_FM_USERNAME` | yes | Account whose history is imported |
//! | `LAST_FM_PASSWORD` | one of | Plain password, md5-hashed on load |
//! | `LAST_FM_PASSWORD_HASH` | one of | Pre-computed md5 hex of the password |
//! | `LAST_FM_IMPORT_LIMIT` | no | Number of recent plays to fetch (default 10) |
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::LastFmConfig;
//!
//! let config = LastFmConfig::from_env()?;
//! config.validate()?;
//! ```

use crate::error::{Error, Result};
use md5::{Digest, Md5};
use std::fmt;

/// Default number of recent plays the importer fetches.
pub const DEFAULT_IMPORT_LIMIT: usize = 10;

/// Upper bound accepted by `user.getRecentTracks` per page.
pub const MAX_IMPORT_LIMIT: usize = 200;

pub const ENV_API_KEY: &str = "LAST_FM_API_KEY";
pub const ENV_API_SECRET: &str = "LAST_FM_API_SECRET";
pub const ENV_USERNAME: &str = "LAST_FM_USERNAME";
pub const ENV_PASSWORD: &str = "LAST_FM_PASSWORD";
pub const ENV_PASSWORD_HASH: &str = "LAST_FM_PASSWORD_HASH";
pub const ENV_IMPORT_LIMIT: &str = "LAST_FM_IMPORT_LIMIT";

/// Last.fm credentials and import settings.
///
/// `Debug` output never includes the secret, the password hash or the API key.
#[derive(Clone, PartialEq, Eq)]
pub struct LastFmConfig {
    pub api_key: String,
    pub api_secret: String,
    pub username: String,
    /// Lowercase hex md5 of the account password
    pub password_hash: String,
    /// Number of recent plays to fetch
    pub import_limit: usize,
}

impl fmt::Debug for LastFmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LastFmConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("import_limit", &self.import_limit)
            .finish()
    }
}

impl LastFmConfig {
    /// Creates a configuration from already-hashed credentials.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            import_limit: DEFAULT_IMPORT_LIMIT,
        }
    }

    /// Sets the number of recent plays to fetch
    pub fn with_import_limit(mut self, limit: usize) -> Self {
        self.import_limit = limit;
        self
    }

    /// Loads the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is read first if present;
    /// variables already set in the environment take precedence.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::MissingSetting {
                    key: key.to_string(),
                })
        };

        let api_key = require(ENV_API_KEY)?;
        let api_secret = require(ENV_API_SECRET)?;
        let username = require(ENV_USERNAME)?;

        let password_hash = match lookup(ENV_PASSWORD_HASH).filter(|v| !v.is_empty()) {
            Some(hash) => hash.to_ascii_lowercase(),
            None => md5_hex(&require(ENV_PASSWORD)?),
        };

        let import_limit = match lookup(ENV_IMPORT_LIMIT) {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                Error::Config(format!("{} must be a positive integer: {}", ENV_IMPORT_LIMIT, e))
            })?,
            None => DEFAULT_IMPORT_LIMIT,
        };

        let config = Self {
            api_key,
            api_secret,
            username,
            password_hash,
            import_limit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(Error::Config(
                "Last.fm API key and secret cannot be empty".to_string(),
            ));
        }

        if self.username.is_empty() {
            return Err(Error::Config("Last.fm username cannot be empty".to_string()));
        }

        if self.password_hash.len() != 32
            || !self.password_hash.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(Error::Config(
                "Last.fm password hash must be a 32-character md5 hex digest".to_string(),
            ));
        }

        if self.import_limit == 0 || self.import_limit > MAX_IMPORT_LIMIT {
            return Err(Error::Config(format!(
                "Import limit must be between 1 and {}",
                MAX_IMPORT_LIMIT
            )));
        }

        Ok(())
    }
}

/// Lowercase hex md5 digest of `input`.
pub fn md5_hex(input: &str) -> String {
    format!("{:x}", Md5::digest(input.as_bytes()))
}
