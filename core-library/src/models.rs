//! Domain models for the music catalog
//!
//! Value objects wrap a single text label and compare by that label.
//! Aggregates are plain mutable records whose equality and hash come from a
//! canonical dump of every field (see [`crate::canonical`]).
//!
//! `id` and `play_count` are ordinary fields and therefore take part in
//! equality: a stored track (with an id) and an otherwise identical unsaved
//! track (without one) are not equal.

use crate::canonical::{canonical_hash, canonical_json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// =============================================================================
// Value Objects
// =============================================================================

/// Immutable wrapper around a single value.
pub trait ValueObject {
    /// The wrapped value
    fn get_value(&self) -> &str;
}

macro_rules! str_value_object {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw label, or return an already-wrapped value unchanged.
            pub fn from_value(value: impl Into<$name>) -> Self {
                value.into()
            }
        }

        impl ValueObject for $name {
            fn get_value(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&$name> for $name {
            fn from(value: &$name) -> Self {
                value.clone()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

str_value_object! {
    /// Musical genre label, e.g. "shoegaze"
    Genre
}

str_value_object! {
    /// Mood label, e.g. "melancholic"
    Mood
}

fn normalize<T, I>(values: I) -> Vec<T>
where
    I: IntoIterator,
    I::Item: Into<T>,
{
    values.into_iter().map(Into::into).collect()
}

// =============================================================================
// Aggregates
// =============================================================================

/// Entity whose identity is its full structural content.
pub trait AggregateRoot: Serialize {
    /// Name used in logs and errors
    const ENTITY_TYPE: &'static str;

    /// Plain nested mapping of all fields with value objects unwrapped.
    fn dump(&self) -> Value {
        // Plain structs with string keys always serialize
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Canonical text of [`dump`](Self::dump), keys sorted at every depth.
    fn canonical_form(&self) -> String {
        canonical_json(&self.dump())
    }

    /// Deterministic 64-bit hash of the canonical form.
    fn custom_hash(&self) -> u64 {
        canonical_hash(&self.canonical_form())
    }
}

macro_rules! structural_identity {
    ($($name:ident),+ $(,)?) => {
        $(
            impl PartialEq for $name {
                fn eq(&self, other: &Self) -> bool {
                    self.canonical_form() == other.canonical_form()
                }
            }

            impl Eq for $name {}

            impl Hash for $name {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    state.write_u64(self.custom_hash());
                }
            }
        )+
    };
}

/// A performer or composer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl Artist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            genres: Vec::new(),
        }
    }

    pub fn with_aliases<I>(mut self, aliases: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.aliases = normalize(aliases);
        self
    }

    pub fn with_genres<I>(mut self, genres: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Genre>,
    {
        self.genres = normalize(genres);
        self
    }
}

impl AggregateRoot for Artist {
    const ENTITY_TYPE: &'static str = "Artist";
}

/// A release grouping tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub name: String,
    pub artists: Vec<Artist>,
    pub record_label: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub moods: Vec<Mood>,
    pub release_date: Option<DateTime<Utc>>,
    pub id: Option<i64>,
    pub play_count: Option<i64>,
}

impl Album {
    pub fn new(name: impl Into<String>, artists: Vec<Artist>) -> Self {
        Self {
            name: name.into(),
            artists,
            record_label: None,
            genres: Vec::new(),
            moods: Vec::new(),
            release_date: None,
            id: None,
            play_count: None,
        }
    }

    pub fn with_record_label(mut self, label: impl Into<String>) -> Self {
        self.record_label = Some(label.into());
        self
    }

    pub fn with_genres<I>(mut self, genres: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Genre>,
    {
        self.genres = normalize(genres);
        self
    }

    pub fn with_moods<I>(mut self, moods: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Mood>,
    {
        self.moods = normalize(moods);
        self
    }

    pub fn with_release_date(mut self, release_date: DateTime<Utc>) -> Self {
        self.release_date = Some(release_date);
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_play_count(mut self, play_count: i64) -> Self {
        self.play_count = Some(play_count);
        self
    }
}

impl AggregateRoot for Album {
    const ENTITY_TYPE: &'static str = "Album";
}

/// A single recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    /// Length in seconds
    pub length: f64,
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub composers: Vec<Artist>,
    pub album: Option<Album>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub moods: Vec<Mood>,
    pub id: Option<i64>,
    pub play_count: Option<i64>,
}

impl Track {
    pub fn new(title: impl Into<String>, length: f64, artists: Vec<Artist>) -> Self {
        Self {
            title: title.into(),
            length,
            artists,
            composers: Vec::new(),
            album: None,
            genres: Vec::new(),
            moods: Vec::new(),
            id: None,
            play_count: None,
        }
    }

    pub fn with_composers(mut self, composers: Vec<Artist>) -> Self {
        self.composers = composers;
        self
    }

    pub fn with_album(mut self, album: Album) -> Self {
        self.album = Some(album);
        self
    }

    pub fn with_genres<I>(mut self, genres: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Genre>,
    {
        self.genres = normalize(genres);
        self
    }

    pub fn with_moods<I>(mut self, moods: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Mood>,
    {
        self.moods = normalize(moods);
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_play_count(mut self, play_count: i64) -> Self {
        self.play_count = Some(play_count);
        self
    }

    /// Album foreign key, if the track belongs to a stored album
    pub fn album_id(&self) -> Option<i64> {
        self.album.as_ref().and_then(|album| album.id)
    }
}

impl AggregateRoot for Track {
    const ENTITY_TYPE: &'static str = "Track";
}

/// One recorded play of a stored track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPlayHistory {
    pub track_id: i64,
    pub played_at: DateTime<Utc>,
    pub id: Option<i64>,
}

impl TrackPlayHistory {
    pub fn new(track_id: i64, played_at: DateTime<Utc>) -> Self {
        Self {
            track_id,
            played_at,
            id: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl AggregateRoot for TrackPlayHistory {
    const ENTITY_TYPE: &'static str = "TrackPlayHistory";
}

structural_identity!(Artist, Album, Track, TrackPlayHistory);
