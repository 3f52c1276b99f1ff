//! Track repository implementation

use crate::error::{LibraryError, Result};
use crate::models::{AggregateRoot, Track};
use crate::repositories::GenericRepository;
use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info, warn};

/// Criteria accepted by [`SqliteTrackRepository::find`]
///
/// Keys that are set are combined with `AND`. At least one must be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackFilter {
    /// Exact track id
    pub id: Option<i64>,
    /// Exact title
    pub title: Option<String>,
    /// Exact album id
    pub album_id: Option<i64>,
    /// Title prefix, matched case-sensitively
    pub like_title: Option<String>,
}

impl TrackFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_album_id(mut self, album_id: i64) -> Self {
        self.album_id = Some(album_id);
        self
    }

    pub fn with_title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.like_title = Some(prefix.into());
        self
    }

    /// True when no recognized key is set
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.title.is_none()
            && self.album_id.is_none()
            && self.like_title.is_none()
    }
}

/// Flat `tracks` row
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TrackRow {
    pub id: Option<i64>,
    pub title: String,
    pub length: f64,
    pub album_id: Option<i64>,
    pub play_count: Option<i64>,
}

impl TrackRow {
    /// Storage representation of a track; the album becomes its foreign key
    pub fn from_entity(track: &Track) -> Self {
        Self {
            id: track.id,
            title: track.title.clone(),
            length: track.length,
            album_id: track.album_id(),
            play_count: track.play_count,
        }
    }

    /// Rebuild a track from the row alone.
    ///
    /// Artists, composers, album, genres and moods are not stored in
    /// `tracks` and come back empty.
    pub fn into_track(self) -> Track {
        Track {
            id: self.id,
            play_count: self.play_count,
            ..Track::new(self.title, self.length, Vec::new())
        }
    }
}

/// SQLite implementation of `GenericRepository<Track>`
pub struct SqliteTrackRepository {
    pool: SqlitePool,
}

impl SqliteTrackRepository {
    /// Create a new SQLite track repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Increment the track's play count and persist it
    ///
    /// A missing play count counts as zero.
    ///
    /// # Errors
    /// Returns `NoRowsAffected` if no stored row has the track's id and
    /// `InvalidInput` if the count is already at its maximum; the in-memory
    /// count is left unchanged in both cases.
    pub async fn up_play_count(&self, track: &mut Track) -> Result<()> {
        let previous = track.play_count;
        let next = previous
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| LibraryError::InvalidInput {
                field: "play_count".to_string(),
                message: "play count cannot be incremented past its maximum".to_string(),
            })?;
        track.play_count = Some(next);

        match self.update(track).await {
            Ok(true) => {
                debug!(track_id = ?track.id, play_count = ?track.play_count, "Play count incremented");
                Ok(())
            }
            Ok(false) => {
                track.play_count = previous;
                warn!(track_id = ?track.id, "Play count update matched no rows");
                Err(LibraryError::no_rows(Track::ENTITY_TYPE, track.id))
            }
            Err(e) => {
                track.play_count = previous;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl GenericRepository<Track> for SqliteTrackRepository {
    type Criteria = TrackFilter;

    async fn find(&self, filter: &TrackFilter) -> Result<Vec<Track>> {
        if filter.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "filter".to_string(),
                message: "at least one of id, title, album_id or like_title is required"
                    .to_string(),
            });
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT t.id, t.title, t.length, t.album_id, t.play_count FROM tracks t WHERE ",
        );

        {
            let mut conditions = query.separated(" AND ");
            if let Some(id) = filter.id {
                conditions.push("t.id = ").push_bind_unseparated(id);
            }
            if let Some(title) = &filter.title {
                conditions
                    .push("t.title = ")
                    .push_bind_unseparated(title.clone());
            }
            if let Some(album_id) = filter.album_id {
                conditions
                    .push("t.album_id = ")
                    .push_bind_unseparated(album_id);
            }
            if let Some(prefix) = &filter.like_title {
                conditions
                    .push("substr(t.title, 1, length(")
                    .push_bind_unseparated(prefix.clone())
                    .push_unseparated(")) = ")
                    .push_bind_unseparated(prefix.clone());
            }
        }
        query.push(" ORDER BY t.id");

        let mut conn = self.pool.acquire().await?;
        let rows = query
            .build_query_as::<TrackRow>()
            .fetch_all(&mut *conn)
            .await?;

        debug!(?filter, matches = rows.len(), "Track lookup");

        Ok(rows.into_iter().map(TrackRow::into_track).collect())
    }

    async fn insert(&self, track: &Track) -> Result<Track> {
        let row = TrackRow::from_entity(track);

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO tracks (id, title, length, album_id, play_count)
            VALUES (NULL, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.title)
        .bind(row.length)
        .bind(row.album_id)
        .bind(row.play_count)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let id = result.last_insert_rowid();
        info!(track_id = id, title = %row.title, "Track inserted");

        Ok(Track {
            id: Some(id),
            ..track.clone()
        })
    }

    async fn update(&self, track: &Track) -> Result<bool> {
        let row = TrackRow::from_entity(track);

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE tracks SET
                title = ?, length = ?, album_id = ?, play_count = ?
            WHERE id = ?
            "#,
        )
        .bind(&row.title)
        .bind(row.length)
        .bind(row.album_id)
        .bind(row.play_count)
        .bind(row.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let changed = result.rows_affected() > 0;
        debug!(track_id = ?row.id, changed, "Track update");

        Ok(changed)
    }

    async fn upsert(&self, track: &Track) -> Result<Track> {
        if track.id.is_some() {
            if !self.update(track).await? {
                return Err(LibraryError::no_rows(Track::ENTITY_TYPE, track.id));
            }
            return Ok(track.clone());
        }

        if let Some(album_id) = track.album_id() {
            let filter = TrackFilter::new()
                .with_album_id(album_id)
                .with_title(track.title.clone());

            if let Some(stored) = self.find(&filter).await?.into_iter().next() {
                let target = Track {
                    id: stored.id,
                    ..track.clone()
                };
                if !self.update(&target).await? {
                    return Err(LibraryError::no_rows(Track::ENTITY_TYPE, target.id));
                }
                info!(track_id = ?target.id, album_id, "Upsert matched stored track");
                return Ok(target);
            }
        }

        self.insert(track).await
    }

    async fn delete(&self, track: &Track) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM tracks WHERE id = ?")
            .bind(track.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let deleted = result.rows_affected() > 0;
        debug!(track_id = ?track.id, deleted, "Track delete");

        Ok(deleted)
    }
}
