//! Storage interface
//!
//! The operations the core consumes, per the external interfaces list.
//! Engines never hold a handle to this trait; only route handlers do.

pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::{
    CefrLevel, Item, Learner, MemoryState, PlacementResponseLog, PlacementSession, Rating,
};

pub use sqlite::SqliteStorage;

/// Items with memory state joined in, as returned by `query_items_due`.
pub struct DueItem {
    pub item: Item,
    pub memory: MemoryState,
}

#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_learner(&self, user_key: &str) -> AppResult<Learner>;
    async fn upsert_learner(
        &self,
        user_key: &str,
        cefr: CefrLevel,
        theta: f64,
        last_placement_ts: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    async fn get_item(&self, item_id: &str) -> AppResult<Option<Item>>;

    /// Look up a vocabulary item by its surface word, used by the credit
    /// distributor to find the memory state of a supporting/structural
    /// word that isn't the primary item of the review.
    async fn find_item_by_word(&self, language: &str, word: &str) -> AppResult<Option<Item>>;
    async fn get_memory(&self, user_key: &str, item_id: &str) -> AppResult<Option<MemoryState>>;
    async fn upsert_memory(
        &self,
        user_key: &str,
        item_id: &str,
        memory: &MemoryState,
    ) -> AppResult<()>;

    async fn append_review_log(
        &self,
        user_key: &str,
        item_id: &str,
        rating: Rating,
        response_time_ms: Option<i64>,
        ts: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Due REVIEW/RELEARNING and LEARNING items for a learner, ordered
    /// by due ascending, restricted to `states`.
    async fn query_items_due(
        &self,
        user_key: &str,
        language: &str,
        theta_lo: f64,
        theta_hi: f64,
        states: &[&str],
        limit: i64,
    ) -> AppResult<Vec<DueItem>>;

    /// Items in the theta band with no memory state for this learner.
    async fn query_items_new(
        &self,
        user_key: &str,
        language: &str,
        theta_lo: f64,
        theta_hi: f64,
        limit: i64,
    ) -> AppResult<Vec<Item>>;

    /// Any remaining items of the right language, excluding `exclude_ids`.
    async fn query_items_any(
        &self,
        language: &str,
        exclude_ids: &[String],
        limit: i64,
    ) -> AppResult<Vec<Item>>;

    async fn create_placement_session(
        &self,
        user_key: &str,
        language: &str,
        theta: f64,
        se: f64,
    ) -> AppResult<PlacementSession>;

    async fn get_placement_session(&self, id: &str) -> AppResult<Option<PlacementSession>>;

    /// Applies the update only if `expected_seq` still matches the
    /// session's stored `next_seq`, then advances it by one. Returns
    /// `Err(AppError::SessionUnavailable)` on a mismatch, enforcing that
    /// placement answers for a session are committed in submission order.
    #[allow(clippy::too_many_arguments)]
    async fn update_placement_session(
        &self,
        id: &str,
        expected_seq: i32,
        theta: f64,
        se: f64,
        items_completed: i32,
        complete: Option<bool>,
        final_cefr: Option<CefrLevel>,
    ) -> AppResult<()>;

    #[allow(clippy::too_many_arguments)]
    async fn append_placement_response(
        &self,
        log: &PlacementResponseLog,
    ) -> AppResult<()>;

    /// Items of `language` carrying a theta_item, excluding `exclude_ids`.
    async fn query_placement_candidates(
        &self,
        language: &str,
        exclude_ids: &[String],
        limit: i64,
    ) -> AppResult<Vec<Item>>;
}
