//! Play history repository implementation

use crate::error::{LibraryError, Result};
use crate::models::{AggregateRoot, TrackPlayHistory};
use crate::repositories::GenericRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

/// Criteria accepted by [`SqliteTrackPlayHistoryRepository::find`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayHistoryFilter {
    pub id: Option<i64>,
    pub track_id: Option<i64>,
    /// Only plays at or after this instant
    pub played_after: Option<DateTime<Utc>>,
}

impl PlayHistoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_track_id(mut self, track_id: i64) -> Self {
        self.track_id = Some(track_id);
        self
    }

    pub fn played_after(mut self, instant: DateTime<Utc>) -> Self {
        self.played_after = Some(instant);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.track_id.is_none() && self.played_after.is_none()
    }
}

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Unix nanoseconds; representable between 1677 and 2262
fn to_unix_nanos(instant: &DateTime<Utc>) -> Result<i64> {
    instant
        .timestamp_nanos_opt()
        .ok_or_else(|| LibraryError::InvalidInput {
            field: "played_at".to_string(),
            message: format!("{} is outside the storable range", instant),
        })
}

fn from_unix_nanos(nanos: i64) -> Result<DateTime<Utc>> {
    let secs = nanos.div_euclid(NANOS_PER_SEC);
    let subsec = nanos.rem_euclid(NANOS_PER_SEC) as u32;
    DateTime::<Utc>::from_timestamp(secs, subsec).ok_or_else(|| LibraryError::InvalidInput {
        field: "played_at".to_string(),
        message: format!("timestamp {} out of range", nanos),
    })
}

#[derive(Debug, FromRow)]
struct PlayHistoryRow {
    id: i64,
    track_id: i64,
    played_at: i64,
}

impl PlayHistoryRow {
    fn into_entity(self) -> Result<TrackPlayHistory> {
        let played_at = from_unix_nanos(self.played_at)?;
        Ok(TrackPlayHistory::new(self.track_id, played_at).with_id(self.id))
    }
}

/// SQLite implementation of `GenericRepository<TrackPlayHistory>`
///
/// `played_at` is stored as unix nanoseconds.
pub struct SqliteTrackPlayHistoryRepository {
    pool: SqlitePool,
}

impl SqliteTrackPlayHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one play of a stored track at `played_at`
    pub async fn record_play(
        &self,
        track_id: i64,
        played_at: DateTime<Utc>,
    ) -> Result<TrackPlayHistory> {
        self.insert(&TrackPlayHistory::new(track_id, played_at))
            .await
    }
}

#[async_trait]
impl GenericRepository<TrackPlayHistory> for SqliteTrackPlayHistoryRepository {
    type Criteria = PlayHistoryFilter;

    async fn find(&self, filter: &PlayHistoryFilter) -> Result<Vec<TrackPlayHistory>> {
        if filter.is_empty() {
            return Err(LibraryError::InvalidInput {
                field: "filter".to_string(),
                message: "at least one of id, track_id or played_after is required"
                    .to_string(),
            });
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id, track_id, played_at FROM track_play_history WHERE ",
        );

        {
            let mut conditions = query.separated(" AND ");
            if let Some(id) = filter.id {
                conditions.push("id = ").push_bind_unseparated(id);
            }
            if let Some(track_id) = filter.track_id {
                conditions.push("track_id = ").push_bind_unseparated(track_id);
            }
            if let Some(after) = filter.played_after {
                conditions
                    .push("played_at >= ")
                    .push_bind_unseparated(to_unix_nanos(&after)?);
            }
        }
        query.push(" ORDER BY played_at, id");

        let mut conn = self.pool.acquire().await?;
        let rows = query
            .build_query_as::<PlayHistoryRow>()
            .fetch_all(&mut *conn)
            .await?;

        debug!(?filter, matches = rows.len(), "Play history lookup");

        rows.into_iter().map(PlayHistoryRow::into_entity).collect()
    }

    async fn insert(&self, entry: &TrackPlayHistory) -> Result<TrackPlayHistory> {
        let played_at = to_unix_nanos(&entry.played_at)?;
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO track_play_history (id, track_id, played_at) VALUES (NULL, ?, ?)",
        )
        .bind(entry.track_id)
        .bind(played_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let id = result.last_insert_rowid();
        info!(play_id = id, track_id = entry.track_id, "Play recorded");

        Ok(TrackPlayHistory {
            id: Some(id),
            ..entry.clone()
        })
    }

    async fn update(&self, entry: &TrackPlayHistory) -> Result<bool> {
        let played_at = to_unix_nanos(&entry.played_at)?;
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE track_play_history SET track_id = ?, played_at = ? WHERE id = ?",
        )
        .bind(entry.track_id)
        .bind(played_at)
        .bind(entry.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Plays are events; without an id this always inserts.
    async fn upsert(&self, entry: &TrackPlayHistory) -> Result<TrackPlayHistory> {
        if entry.id.is_none() {
            return self.insert(entry).await;
        }

        if !self.update(entry).await? {
            return Err(LibraryError::no_rows(TrackPlayHistory::ENTITY_TYPE, entry.id));
        }
        Ok(entry.clone())
    }

    async fn delete(&self, entry: &TrackPlayHistory) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM track_play_history WHERE id = ?")
            .bind(entry.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::Track;
    use crate::repositories::SqliteTrackRepository;
    use chrono::TimeZone;

    async fn setup() -> (SqliteTrackPlayHistoryRepository, SqliteTrackRepository) {
        let pool = create_test_pool().await.unwrap();
        (
            SqliteTrackPlayHistoryRepository::new(pool.clone()),
            SqliteTrackRepository::new(pool),
        )
    }

    async fn stored_track(tracks: &SqliteTrackRepository, title: &str) -> i64 {
        tracks
            .insert(&Track::new(title, 200.0, vec![]))
            .await
            .unwrap()
            .id
            .unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn at_millis(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_unix_nanos_conversion() {
        let instant = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let nanos = to_unix_nanos(&instant).unwrap();

        assert_eq!(nanos, 1_700_000_000_123_456_789);
        assert_eq!(from_unix_nanos(nanos).unwrap(), instant);
        assert_eq!(from_unix_nanos(-1).unwrap(), Utc.timestamp_opt(-1, 999_999_999).unwrap());

        let far = Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(to_unix_nanos(&far), Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_record_and_find_by_track() {
        let (plays, tracks) = setup().await;
        let first = stored_track(&tracks, "Alison").await;
        let second = stored_track(&tracks, "Machine Gun").await;

        plays.record_play(first, at(2_000)).await.unwrap();
        plays.record_play(first, at(1_000)).await.unwrap();
        plays.record_play(second, at(1_500)).await.unwrap();

        let found = plays
            .find(&PlayHistoryFilter::new().with_track_id(first))
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].played_at, at(1_000));
        assert_eq!(found[1].played_at, at(2_000));
        assert!(found.iter().all(|p| p.track_id == first));
    }

    #[tokio::test]
    async fn test_find_played_after() {
        let (plays, tracks) = setup().await;
        let track_id = stored_track(&tracks, "Alison").await;
        plays.record_play(track_id, at(1_000)).await.unwrap();
        plays.record_play(track_id, at(3_000)).await.unwrap();

        let found = plays
            .find(&PlayHistoryFilter::new().played_after(at(2_000)))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].played_at, at(3_000));
    }

    #[tokio::test]
    async fn test_played_after_keeps_sub_second_bound() {
        let (plays, tracks) = setup().await;
        let track_id = stored_track(&tracks, "Alison").await;
        plays.record_play(track_id, at_millis(20_000)).await.unwrap();
        let later = plays.record_play(track_id, at_millis(20_950)).await.unwrap();

        let found = plays
            .find(&PlayHistoryFilter::new().played_after(at_millis(20_900)))
            .await
            .unwrap();

        assert_eq!(found, vec![later]);
    }

    #[tokio::test]
    async fn test_find_requires_a_key() {
        let (plays, _tracks) = setup().await;

        let result = plays.find(&PlayHistoryFilter::new()).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_insert_round_trips_through_find() {
        let (plays, tracks) = setup().await;
        let track_id = stored_track(&tracks, "Alison").await;

        let recorded = plays.record_play(track_id, at(1_700_000_000)).await.unwrap();
        let found = plays
            .find(&PlayHistoryFilter::new().with_id(recorded.id.unwrap()))
            .await
            .unwrap();

        assert_eq!(found, vec![recorded]);
    }

    #[tokio::test]
    async fn test_sub_second_play_round_trips_through_find() {
        let (plays, tracks) = setup().await;
        let track_id = stored_track(&tracks, "Alison").await;

        let recorded = plays
            .record_play(track_id, at_millis(1_700_000_000_250))
            .await
            .unwrap();
        let found = plays
            .find(&PlayHistoryFilter::new().with_id(recorded.id.unwrap()))
            .await
            .unwrap();

        assert_eq!(found, vec![recorded]);
        assert_eq!(found[0].played_at.timestamp_subsec_millis(), 250);
    }

    #[tokio::test]
    async fn test_unstorable_instant_is_rejected() {
        let (plays, tracks) = setup().await;
        let track_id = stored_track(&tracks, "Alison").await;
        let far = Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap();

        let result = plays.record_play(track_id, far).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_play_for_unknown_track_is_rejected() {
        let (plays, _tracks) = setup().await;

        let result = plays.record_play(404, at(1_000)).await;
        assert!(matches!(result, Err(LibraryError::Database(_))));
    }

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let (plays, tracks) = setup().await;
        let track_id = stored_track(&tracks, "Alison").await;

        let mut entry = plays
            .upsert(&TrackPlayHistory::new(track_id, at(1_000)))
            .await
            .unwrap();
        assert!(entry.id.is_some());

        entry.played_at = at(5_000);
        assert_eq!(plays.upsert(&entry).await.unwrap(), entry);

        assert!(plays.delete(&entry).await.unwrap());
        assert!(!plays.delete(&entry).await.unwrap());

        let missing = plays.upsert(&entry).await;
        assert!(matches!(missing, Err(LibraryError::NoRowsAffected { .. })));
    }

    #[tokio::test]
    async fn test_deleting_track_cascades_to_plays() {
        let (plays, tracks) = setup().await;
        let track = tracks
            .insert(&Track::new("Alison", 200.0, vec![]))
            .await
            .unwrap();
        let track_id = track.id.unwrap();
        plays.record_play(track_id, at(1_000)).await.unwrap();

        assert!(tracks.delete(&track).await.unwrap());

        let found = plays
            .find(&PlayHistoryFilter::new().with_track_id(track_id))
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
