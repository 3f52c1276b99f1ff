//! Recent-tracks import
//!
//! Turns a user's latest Last.fm scrobbles into catalog [`Track`]s.

use crate::error::{Result, ScrobbleError};
use crate::providers::lastfm::{LastFmClient, TrackInfo};
use core_library::models::{AggregateRoot, Artist, Track};
use core_runtime::config::LastFmConfig;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Builds catalog tracks from a user's recent listening history
pub struct RecentTracksImporter {
    client: LastFmClient,
    username: String,
    password_hash: String,
}

impl RecentTracksImporter {
    pub fn new(
        client: LastFmClient,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            client,
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    pub fn from_config(client: LastFmClient, config: &LastFmConfig) -> Self {
        Self::new(client, config.username.clone(), config.password_hash.clone())
    }

    /// Imports up to `limit` recent plays
    ///
    /// Each distinct play becomes one track with a single artist and its
    /// length in seconds. Repeated scrobbles of the same track collapse into
    /// the first occurrence. Every returned track carries the user's play
    /// count for it.
    ///
    /// # Errors
    /// Authentication, network and decoding failures are returned as is;
    /// nothing is produced in that case.
    pub async fn run(&self, limit: usize) -> Result<Vec<Track>> {
        if limit == 0 {
            return Err(ScrobbleError::Config(
                "import limit must be at least 1".to_string(),
            ));
        }

        self.client
            .authenticate(&self.username, &self.password_hash)
            .await?;

        let scrobbles = self.client.recent_tracks(&self.username, limit).await?;

        let mut infos: HashMap<(String, String), TrackInfo> = HashMap::new();
        let mut seen: HashSet<(Track, String, String)> = HashSet::new();
        let mut imported: Vec<(Track, Option<i64>)> = Vec::new();

        for scrobble in scrobbles.iter().take(limit) {
            let key = source_key(&scrobble.artist, &scrobble.title);

            let info = match infos.get(&key) {
                Some(info) => info.clone(),
                None => {
                    let info = self
                        .client
                        .track_info(&scrobble.artist, &scrobble.title, &self.username)
                        .await?;
                    infos.insert(key.clone(), info.clone());
                    info
                }
            };

            let track = Track::new(
                scrobble.title.clone(),
                info.duration_ms as f64 / 1000.0,
                vec![Artist::new(scrobble.artist.clone())],
            );

            if seen.insert((track.clone(), key.0, key.1)) {
                imported.push((track, info.user_playcount));
            } else {
                debug!(title = %scrobble.title, artist = %scrobble.artist, "Skipping repeated scrobble");
            }
        }

        let tracks: Vec<Track> = imported
            .into_iter()
            .map(|(mut track, play_count)| {
                track.play_count = play_count;
                track
            })
            .collect();

        info!(
            scrobbles = scrobbles.len(),
            tracks = tracks.len(),
            "Imported recent tracks"
        );
        Ok(tracks)
    }
}

/// Last.fm treats artist and title case-insensitively
fn source_key(artist: &str, title: &str) -> (String, String) {
    (artist.to_lowercase(), title.to_lowercase())
}

/// Renders tracks as a pretty-printed JSON array of their dumps
pub fn render_tracks_json(tracks: &[Track]) -> String {
    let dumps = Value::Array(tracks.iter().map(AggregateRoot::dump).collect());
    format!("{:#}", dumps)
}
