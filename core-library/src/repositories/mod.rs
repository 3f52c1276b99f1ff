//! Persistence for catalog aggregates.
//!
//! [`GenericRepository`] is the storage contract, generic over the aggregate
//! and over the filter its `find` accepts. The SQLite implementations run
//! each write in its own transaction: it commits on success and rolls back
//! when dropped on an error path.

use crate::error::Result;
use crate::models::AggregateRoot;
use async_trait::async_trait;

pub mod play_history;
pub mod track;

pub use play_history::{PlayHistoryFilter, SqliteTrackPlayHistoryRepository};
pub use track::{SqliteTrackRepository, TrackFilter, TrackRow};

/// Storage contract for one aggregate type
///
/// Every operation fails with [`LibraryError::Database`](crate::LibraryError::Database)
/// when the underlying connection is unusable.
#[async_trait]
pub trait GenericRepository<E>: Send + Sync
where
    E: AggregateRoot + Send + Sync + 'static,
{
    /// Filter accepted by [`find`](Self::find)
    type Criteria: Send + Sync;

    /// Find entities matching every key set in `criteria`
    ///
    /// # Errors
    /// Returns `InvalidInput` if `criteria` sets no recognized key.
    async fn find(&self, criteria: &Self::Criteria) -> Result<Vec<E>>;

    /// Insert a new entity
    ///
    /// # Returns
    /// The entity with its storage-assigned id
    async fn insert(&self, entity: &E) -> Result<E>;

    /// Update the stored row for the entity's id
    ///
    /// # Returns
    /// - `Ok(true)` if a row was changed
    /// - `Ok(false)` if no row has that id
    async fn update(&self, entity: &E) -> Result<bool>;

    /// Update the matching stored entity, or insert a new one
    ///
    /// Exactly one of the two writes happens.
    async fn upsert(&self, entity: &E) -> Result<E>;

    /// Delete the stored row for the entity's id
    ///
    /// # Returns
    /// - `Ok(true)` if a row was deleted
    /// - `Ok(false)` if no row has that id
    async fn delete(&self, entity: &E) -> Result<bool>;
}
