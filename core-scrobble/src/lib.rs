//! # Scrobble Import
//!
//! Reads a user's listening history from Last.fm and turns it into catalog
//! tracks.
//!
//! - [`providers::LastFmClient`] speaks the signed Last.fm web API over any
//!   [`HttpClient`](bridge_traits::http::HttpClient)
//! - [`import::RecentTracksImporter`] builds deduplicated [`Track`]s with
//!   per-user play counts
//! - The `import-lastfm-tracks` binary prints the result as JSON
//!
//! [`Track`]: core_library::models::Track

pub mod error;
pub mod import;
pub mod providers;

pub use error::{Result, ScrobbleError};
pub use import::{render_tracks_json, RecentTracksImporter};
pub use providers::LastFmClient;
