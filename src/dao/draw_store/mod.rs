#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{DrawOverrideEntity, DrawQuery, DrawResultEntity, GameStateEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use std::time::SystemTime;

/// Abstraction over the persistence layer for game state, draw history and overrides.
///
/// Uniqueness of draw numbers and the atomicity of the state advance are the backend's
/// responsibility: implementations must never let two writers both succeed.
pub trait DrawStore: Send + Sync {
    fn load_game_state(&self) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;
    /// Insert the singleton if absent. Returns `false` when a state already exists.
    fn insert_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<bool>>;
    /// Advance the singleton only if its current draw number still equals `expected_current`.
    /// Returns `None` when the comparison failed (or no state exists).
    fn advance_game_state(
        &self,
        expected_current: u32,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;
    fn update_draw_interval(
        &self,
        seconds: u32,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;
    /// Append a draw result. Fails with [`StorageError::Duplicate`](crate::dao::storage::StorageError::Duplicate)
    /// when the draw number is taken.
    fn insert_draw_result(&self, draw: DrawResultEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_draw_result(
        &self,
        draw_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<DrawResultEntity>>>;
    /// List results matching `query`, newest draw first.
    fn list_draw_results(
        &self,
        query: DrawQuery,
    ) -> BoxFuture<'static, StorageResult<Vec<DrawResultEntity>>>;
    fn upsert_override(
        &self,
        entry: DrawOverrideEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_override(
        &self,
        draw_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<DrawOverrideEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
