//! Last.fm API Client
//!
//! Signed calls against the Last.fm web service, used to read a user's
//! listening history.
//!
//! ## API Methods
//!
//! - **auth.getMobileSession**: exchanges username and password hash for a session key
//! - **user.getRecentTracks**: most recent scrobbles, newest first
//! - **track.getInfo**: duration and per-user play count of one track
//!
//! ## Signing
//!
//! Every call carries `api_sig`: the md5 hex of all parameters except
//! `format`, sorted by name and concatenated as `name` + `value`, followed by
//! the API secret. Once a session is established its key is sent as `sk`.
//!
//! ## Rate Limiting
//!
//! Requests are spaced by a configurable minimum delay.
//!
//! ## Usage
//!
//! ```ignore
//! use core_scrobble::providers::LastFmClient;
//!
//! let client = LastFmClient::new(http_client, api_key, api_secret, 250);
//! client.authenticate("rj", &password_hash).await?;
//! let plays = client.recent_tracks("rj", 10).await?;
//! ```

use crate::error::{Result, ScrobbleError};
use bridge_traits::http::{HttpClient, HttpRequest};
use core_runtime::config::md5_hex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Last.fm API base URL
pub const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";

const CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Parameters left out of the signature
const UNSIGNED_PARAMS: &[&str] = &["format", "callback"];

/// Session key returned by `auth.getMobileSession`
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// One entry of a user's listening history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrobbledTrack {
    pub artist: String,
    pub title: String,
}

/// Result of `track.getInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub artist: String,
    pub title: String,
    /// Duration in milliseconds; Last.fm reports 0 when unknown
    pub duration_ms: u64,
    /// Plays by the user the info was requested for
    pub user_playcount: Option<i64>,
}

/// Signed Last.fm client over a host [`HttpClient`]
///
/// Holds at most one session; [`authenticate`](Self::authenticate) replaces it.
pub struct LastFmClient {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    api_secret: String,
    base_url: String,
    session: RwLock<Option<SessionKey>>,
    throttle: Mutex<Throttle>,
}

/// Keeps consecutive calls at least `spacing` apart
struct Throttle {
    spacing: Duration,
    next_slot: Option<Instant>,
}

impl Throttle {
    fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            next_slot: None,
        }
    }

    /// Waits for the next free slot and books the one after it
    async fn acquire(&mut self) {
        if let Some(slot) = self.next_slot {
            if slot > Instant::now() {
                debug!(spacing_ms = self.spacing.as_millis() as u64, "Throttling Last.fm call");
                tokio::time::sleep_until(slot).await;
            }
        }
        self.next_slot = Some(Instant::now() + self.spacing);
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Last.fm error response
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: i32,
    message: String,
}

/// Last.fm encodes most numbers as strings, but not consistently.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(i64),
    Text(String),
}

impl Numeric {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// A single item is sent as an object instead of a one-element list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct TextField {
    #[serde(rename = "#text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session: SessionEntry,
}

#[derive(Debug, Deserialize)]
struct SessionEntry {
    key: String,
}

#[derive(Debug, Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracks,
}

#[derive(Debug, Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: OneOrMany<RecentTrackEntry>,
}

#[derive(Debug, Deserialize)]
struct RecentTrackEntry {
    name: String,
    artist: TextField,
    #[serde(rename = "@attr", default)]
    attr: Option<EntryAttr>,
}

impl RecentTrackEntry {
    fn is_now_playing(&self) -> bool {
        self.attr
            .as_ref()
            .and_then(|attr| attr.nowplaying.as_deref())
            .is_some_and(|flag| flag.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Deserialize)]
struct EntryAttr {
    #[serde(default)]
    nowplaying: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackInfoResponse {
    track: TrackInfoEntry,
}

#[derive(Debug, Deserialize)]
struct TrackInfoEntry {
    name: String,
    artist: ArtistEntry,
    #[serde(default)]
    duration: Option<Numeric>,
    #[serde(default)]
    userplaycount: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct ArtistEntry {
    name: String,
}

impl LastFmClient {
    /// `rate_limit_delay_ms` is the minimum spacing between two calls.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        rate_limit_delay_ms: u64,
    ) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            base_url: LASTFM_API_BASE.to_string(),
            session: RwLock::new(None),
            throttle: Mutex::new(Throttle::new(Duration::from_millis(rate_limit_delay_ms))),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Session key of the last successful [`authenticate`](Self::authenticate)
    pub async fn session(&self) -> Option<SessionKey> {
        self.session.read().await.clone()
    }

    /// Opens a session for `username`
    ///
    /// `password_hash` is the lowercase md5 hex of the account password. The
    /// session key is kept and sent with every later call.
    pub async fn authenticate(&self, username: &str, password_hash: &str) -> Result<SessionKey> {
        let auth_token = md5_hex(&format!("{}{}", username, password_hash));

        let response: SessionResponse = self
            .call(
                "auth.getMobileSession",
                vec![
                    ("username", username.to_string()),
                    ("authToken", auth_token),
                ],
            )
            .await?;

        let key = SessionKey::new(response.session.key);
        *self.session.write().await = Some(key.clone());

        info!(username, "Authenticated with Last.fm");
        Ok(key)
    }

    /// Fetches up to `limit` recent scrobbles of `user`, newest first
    ///
    /// The track currently playing is not a completed scrobble and is skipped.
    pub async fn recent_tracks(&self, user: &str, limit: usize) -> Result<Vec<ScrobbledTrack>> {
        let response: RecentTracksResponse = self
            .call(
                "user.getRecentTracks",
                vec![("user", user.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        let tracks: Vec<ScrobbledTrack> = response
            .recenttracks
            .track
            .into_vec()
            .into_iter()
            .filter(|entry| {
                let playing = entry.is_now_playing();
                if playing {
                    debug!(title = %entry.name, "Skipping track currently playing");
                }
                !playing
            })
            .take(limit)
            .map(|entry| ScrobbledTrack {
                artist: entry.artist.text,
                title: entry.name,
            })
            .collect();

        debug!(user, count = tracks.len(), "Fetched recent tracks");
        Ok(tracks)
    }

    /// Fetches duration and `username`'s play count for one track
    pub async fn track_info(&self, artist: &str, title: &str, username: &str) -> Result<TrackInfo> {
        let response: TrackInfoResponse = self
            .call(
                "track.getInfo",
                vec![
                    ("artist", artist.to_string()),
                    ("track", title.to_string()),
                    ("username", username.to_string()),
                ],
            )
            .await?;

        let entry = response.track;
        let duration_ms = entry
            .duration
            .as_ref()
            .and_then(Numeric::as_i64)
            .and_then(|ms| u64::try_from(ms).ok())
            .unwrap_or(0);

        Ok(TrackInfo {
            artist: entry.artist.name,
            title: entry.name,
            duration_ms,
            user_playcount: entry.userplaycount.as_ref().and_then(Numeric::as_i64),
        })
    }

    /// Computes `api_sig` for a parameter set
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut signed: Vec<&(&str, String)> = params
            .iter()
            .filter(|(name, _)| !UNSIGNED_PARAMS.contains(name))
            .collect();
        signed.sort_by(|a, b| a.0.cmp(b.0));

        let mut payload: String = signed
            .into_iter()
            .map(|(name, value)| format!("{}{}", name, value))
            .collect();
        payload.push_str(&self.api_secret);

        md5_hex(&payload)
    }

    /// Performs one signed call and decodes the payload
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<T> {
        params.push(("method", method.to_string()));
        params.push(("api_key", self.api_key.clone()));
        if let Some(session) = self.session.read().await.as_ref() {
            params.push(("sk", session.as_str().to_string()));
        }
        let signature = self.sign(&params);
        params.push(("api_sig", signature));
        params.push(("format", "json".to_string()));

        debug!(method, "Calling Last.fm");

        self.throttle.lock().await.acquire().await;

        let request = HttpRequest::post(self.base_url.clone())
            .form(&params)
            .timeout(CALL_TIMEOUT);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ScrobbleError::NetworkError(format!("Last.fm request failed: {}", e)))?;

        // Error bodies come with 4xx statuses as well as with 200
        if let Ok(error_resp) = response.json::<ErrorResponse>() {
            warn!(method, code = error_resp.error, message = %error_resp.message, "Last.fm API error");
            return Err(ScrobbleError::RemoteApi(format!(
                "Last.fm API error {}: {}",
                error_resp.error, error_resp.message
            )));
        }

        if !response.is_success() {
            return Err(ScrobbleError::HttpError {
                status: response.status,
                body: response.text_lossy(),
            });
        }

        response.json().map_err(|e| {
            ScrobbleError::JsonParse(format!("Failed to parse Last.fm {} response: {}", method, e))
        })
    }
}
