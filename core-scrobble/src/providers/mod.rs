//! External Scrobbling Providers
//!
//! Clients for services that record a user's listening history.

pub mod lastfm;

pub use lastfm::{LastFmClient, ScrobbledTrack, SessionKey, TrackInfo};
