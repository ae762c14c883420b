//! SQLite-backed `Storage` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    CardState, CefrLevel, Item, ItemPayload, ItemType, Learner, MemoryState,
    PlacementResponseLog, PlacementSession, Rating,
};

use super::{DueItem, Storage};

pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ItemRow {
    id: String,
    language: String,
    item_type: String,
    target_word: String,
    theta_item: Option<f64>,
    answer: Option<String>,
    sentence: Option<String>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            language: row.language,
            item_type: ItemType::from(row.item_type),
            payload: ItemPayload {
                target_word: row.target_word,
                theta_item: row.theta_item,
                answer: row.answer,
                sentence: row.sentence,
            },
        }
    }
}

#[derive(FromRow)]
struct MemoryRow {
    stability: f64,
    difficulty: f64,
    state: String,
    reps: i32,
    lapses: i32,
    scheduled_days: i32,
    elapsed_days: i32,
    due: DateTime<Utc>,
    last_review: Option<DateTime<Utc>>,
}

impl From<MemoryRow> for MemoryState {
    fn from(row: MemoryRow) -> Self {
        MemoryState {
            stability: row.stability,
            difficulty: row.difficulty,
            state: CardState::from(row.state),
            reps: row.reps,
            lapses: row.lapses,
            scheduled_days: row.scheduled_days,
            elapsed_days: row.elapsed_days,
            due: row.due,
            last_review: row.last_review,
        }
    }
}

#[derive(FromRow)]
struct LearnerRow {
    user_key: String,
    cefr: String,
    theta: f64,
    last_placement_ts: Option<DateTime<Utc>>,
}

impl From<LearnerRow> for Learner {
    fn from(row: LearnerRow) -> Self {
        Learner {
            user_key: row.user_key,
            cefr: CefrLevel::from(row.cefr),
            theta: row.theta,
            last_placement_ts: row.last_placement_ts,
        }
    }
}

#[derive(FromRow)]
struct PlacementSessionRow {
    id: String,
    user_key: String,
    language: String,
    theta: f64,
    se: f64,
    items_completed: i32,
    is_complete: i64,
    final_cefr: Option<String>,
    next_seq: i32,
}

impl From<PlacementSessionRow> for PlacementSession {
    fn from(row: PlacementSessionRow) -> Self {
        PlacementSession {
            id: row.id,
            user_key: row.user_key,
            language: row.language,
            theta: row.theta,
            se: row.se,
            items_completed: row.items_completed,
            is_complete: row.is_complete != 0,
            final_cefr: row.final_cefr.map(CefrLevel::from),
            next_seq: row.next_seq,
        }
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get_learner(&self, user_key: &str) -> AppResult<Learner> {
        let row = sqlx::query_as::<_, LearnerRow>("SELECT * FROM learners WHERE user_key = ?")
            .bind(user_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => row.into(),
            None => Learner::default_for(user_key),
        })
    }

    async fn upsert_learner(
        &self,
        user_key: &str,
        cefr: CefrLevel,
        theta: f64,
        last_placement_ts: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let cefr_str: String = cefr.into();
        sqlx::query(
            r#"
            INSERT INTO learners (user_key, cefr, theta, last_placement_ts)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_key) DO UPDATE SET
                cefr = excluded.cefr,
                theta = excluded.theta,
                last_placement_ts = excluded.last_placement_ts
            "#,
        )
        .bind(user_key)
        .bind(cefr_str)
        .bind(theta)
        .bind(last_placement_ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_item(&self, item_id: &str) -> AppResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Item::from))
    }

    async fn find_item_by_word(&self, language: &str, word: &str) -> AppResult<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT * FROM items WHERE language = ? AND target_word = ? LIMIT 1",
        )
        .bind(language)
        .bind(word)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Item::from))
    }

    async fn get_memory(&self, user_key: &str, item_id: &str) -> AppResult<Option<MemoryState>> {
        let row = sqlx::query_as::<_, MemoryRow>(
            "SELECT * FROM memory_states WHERE user_key = ? AND item_id = ?",
        )
        .bind(user_key)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(MemoryState::from))
    }

    async fn upsert_memory(
        &self,
        user_key: &str,
        item_id: &str,
        memory: &MemoryState,
    ) -> AppResult<()> {
        let state_str: String = memory.state.into();
        sqlx::query(
            r#"
            INSERT INTO memory_states (
                user_key, item_id, stability, difficulty, state, reps, lapses,
                scheduled_days, elapsed_days, due, last_review, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_key, item_id) DO UPDATE SET
                stability = excluded.stability,
                difficulty = excluded.difficulty,
                state = excluded.state,
                reps = excluded.reps,
                lapses = excluded.lapses,
                scheduled_days = excluded.scheduled_days,
                elapsed_days = excluded.elapsed_days,
                due = excluded.due,
                last_review = excluded.last_review,
                updated_at = excluded.updated_at
            WHERE excluded.updated_at >= memory_states.updated_at
            "#,
        )
        .bind(user_key)
        .bind(item_id)
        .bind(memory.stability)
        .bind(memory.difficulty)
        .bind(state_str)
        .bind(memory.reps)
        .bind(memory.lapses)
        .bind(memory.scheduled_days)
        .bind(memory.elapsed_days)
        .bind(memory.due)
        .bind(memory.last_review)
        .bind(memory.last_review.unwrap_or_else(Utc::now))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_review_log(
        &self,
        user_key: &str,
        item_id: &str,
        rating: Rating,
        response_time_ms: Option<i64>,
        ts: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO review_log (id, user_key, item_id, rating, response_time_ms, reviewed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_key)
        .bind(item_id)
        .bind(rating.as_i32())
        .bind(response_time_ms)
        .bind(ts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query_items_due(
        &self,
        user_key: &str,
        language: &str,
        theta_lo: f64,
        theta_hi: f64,
        states: &[&str],
        limit: i64,
    ) -> AppResult<Vec<DueItem>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = states.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            r#"
            SELECT i.*, m.stability, m.difficulty, m.state, m.reps, m.lapses,
                   m.scheduled_days, m.elapsed_days, m.due, m.last_review
            FROM memory_states m
            JOIN items i ON i.id = m.item_id
            WHERE m.user_key = ? AND i.language = ?
              AND i.theta_item BETWEEN ? AND ?
              AND m.state IN ({placeholders})
              AND m.due <= ?
            ORDER BY m.due ASC
            LIMIT ?
            "#
        );

        let mut query = sqlx::query(&sql)
            .bind(user_key)
            .bind(language)
            .bind(theta_lo)
            .bind(theta_hi);
        for s in states {
            query = query.bind(*s);
        }
        let rows = query
            .bind(Utc::now())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        use sqlx::Row;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let item = Item {
                id: row.try_get("id")?,
                language: row.try_get("language")?,
                item_type: ItemType::from(row.try_get::<String, _>("item_type")?),
                payload: ItemPayload {
                    target_word: row.try_get("target_word")?,
                    theta_item: row.try_get("theta_item")?,
                    answer: row.try_get("answer")?,
                    sentence: row.try_get("sentence")?,
                },
            };
            let memory = MemoryState {
                stability: row.try_get("stability")?,
                difficulty: row.try_get("difficulty")?,
                state: CardState::from(row.try_get::<String, _>("state")?),
                reps: row.try_get("reps")?,
                lapses: row.try_get("lapses")?,
                scheduled_days: row.try_get("scheduled_days")?,
                elapsed_days: row.try_get("elapsed_days")?,
                due: row.try_get("due")?,
                last_review: row.try_get("last_review")?,
            };
            out.push(DueItem { item, memory });
        }
        Ok(out)
    }

    async fn query_items_new(
        &self,
        user_key: &str,
        language: &str,
        theta_lo: f64,
        theta_hi: f64,
        limit: i64,
    ) -> AppResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT i.* FROM items i
            LEFT JOIN memory_states m ON m.item_id = i.id AND m.user_key = ?
            WHERE i.language = ? AND i.theta_item BETWEEN ? AND ? AND m.item_id IS NULL
            ORDER BY RANDOM()
            LIMIT ?
            "#,
        )
        .bind(user_key)
        .bind(language)
        .bind(theta_lo)
        .bind(theta_hi)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn query_items_any(
        &self,
        language: &str,
        exclude_ids: &[String],
        limit: i64,
    ) -> AppResult<Vec<Item>> {
        if exclude_ids.is_empty() {
            let rows = sqlx::query_as::<_, ItemRow>(
                "SELECT * FROM items WHERE language = ? ORDER BY RANDOM() LIMIT ?",
            )
            .bind(language)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows.into_iter().map(Item::from).collect());
        }

        let placeholders = exclude_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT * FROM items WHERE language = ? AND id NOT IN ({placeholders}) ORDER BY RANDOM() LIMIT ?"
        );
        let mut query = sqlx::query_as::<_, ItemRow>(&sql).bind(language);
        for id in exclude_ids {
            query = query.bind(id);
        }
        let rows = query.bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn create_placement_session(
        &self,
        user_key: &str,
        language: &str,
        theta: f64,
        se: f64,
    ) -> AppResult<PlacementSession> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO placement_sessions (id, user_key, language, theta, se, items_completed, is_complete, next_seq)
            VALUES (?, ?, ?, ?, ?, 0, 0, 0)
            "#,
        )
        .bind(&id)
        .bind(user_key)
        .bind(language)
        .bind(theta)
        .bind(se)
        .execute(&self.pool)
        .await?;

        Ok(PlacementSession::start(id, user_key, language, theta, se))
    }

    async fn get_placement_session(&self, id: &str) -> AppResult<Option<PlacementSession>> {
        let row =
            sqlx::query_as::<_, PlacementSessionRow>("SELECT * FROM placement_sessions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(PlacementSession::from))
    }

    async fn update_placement_session(
        &self,
        id: &str,
        expected_seq: i32,
        theta: f64,
        se: f64,
        items_completed: i32,
        complete: Option<bool>,
        final_cefr: Option<CefrLevel>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE placement_sessions
            SET theta = ?, se = ?, items_completed = ?, next_seq = next_seq + 1,
                is_complete = COALESCE(?, is_complete),
                final_cefr = COALESCE(?, final_cefr)
            WHERE id = ? AND next_seq = ?
            "#,
        )
        .bind(theta)
        .bind(se)
        .bind(items_completed)
        .bind(complete.map(|c| c as i64))
        .bind(final_cefr.map(String::from))
        .bind(id)
        .bind(expected_seq)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::AppError::SessionUnavailable { id: id.to_string() });
        }
        Ok(())
    }

    async fn append_placement_response(&self, log: &PlacementResponseLog) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO placement_responses (
                session_id, item_id, rating, theta_before, theta_after,
                se_before, se_after, correct, response_time_ms, answered_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&log.session_id)
        .bind(&log.item_id)
        .bind(log.rating)
        .bind(log.theta_before)
        .bind(log.theta_after)
        .bind(log.se_before)
        .bind(log.se_after)
        .bind(log.correct as i64)
        .bind(log.response_time_ms)
        .bind(log.answered_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn query_placement_candidates(
        &self,
        language: &str,
        exclude_ids: &[String],
        limit: i64,
    ) -> AppResult<Vec<Item>> {
        if exclude_ids.is_empty() {
            let rows = sqlx::query_as::<_, ItemRow>(
                "SELECT * FROM items WHERE language = ? AND theta_item IS NOT NULL ORDER BY RANDOM() LIMIT ?",
            )
            .bind(language)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows.into_iter().map(Item::from).collect());
        }

        let placeholders = exclude_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT * FROM items WHERE language = ? AND theta_item IS NOT NULL AND id NOT IN ({placeholders}) ORDER BY RANDOM() LIMIT ?"
        );
        let mut query = sqlx::query_as::<_, ItemRow>(&sql).bind(language);
        for id in exclude_ids {
            query = query.bind(id);
        }
        let rows = query.bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Item::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::migrate(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn get_learner_defaults_when_absent() {
        let storage = SqliteStorage::new(test_pool().await);
        let learner = storage.get_learner("alice").await.unwrap();
        assert_eq!(learner.cefr, CefrLevel::B1);
        assert_eq!(learner.theta, 0.0);
    }

    #[tokio::test]
    async fn upsert_memory_roundtrips() {
        let storage = SqliteStorage::new(test_pool().await);
        sqlx::query("INSERT INTO items (id, language, item_type, target_word, theta_item) VALUES ('i1', 'ru', 'vocabulary', 'foo', 0.0)")
            .execute(&storage.pool)
            .await
            .unwrap();

        let mut state = MemoryState::new(Utc::now());
        state.stability = 5.0;
        storage.upsert_memory("alice", "i1", &state).await.unwrap();

        let fetched = storage.get_memory("alice", "i1").await.unwrap().unwrap();
        assert_eq!(fetched.stability, 5.0);
    }

    #[tokio::test]
    async fn query_items_due_limits_each_state_group_independently() {
        use chrono::Duration;
        let storage = SqliteStorage::new(test_pool().await);
        let now = Utc::now();

        // Three LEARNING rows, all due well before the one REVIEW row.
        for i in 0..3 {
            let item_id = format!("learning-{i}");
            sqlx::query("INSERT INTO items (id, language, item_type, target_word, theta_item) VALUES (?, 'ru', 'vocabulary', ?, 0.0)")
                .bind(&item_id)
                .bind(&item_id)
                .execute(&storage.pool)
                .await
                .unwrap();
            sqlx::query(
                "INSERT INTO memory_states (user_key, item_id, stability, difficulty, state, reps, lapses, scheduled_days, elapsed_days, due, last_review, updated_at) VALUES ('alice', ?, 1.0, 5.0, 'learning', 1, 0, 0, 0, ?, ?, ?)",
            )
            .bind(&item_id)
            .bind(now - Duration::days(1))
            .bind(now)
            .bind(now)
            .execute(&storage.pool)
            .await
            .unwrap();
        }

        sqlx::query("INSERT INTO items (id, language, item_type, target_word, theta_item) VALUES ('review-1', 'ru', 'vocabulary', 'review-1', 0.0)")
            .execute(&storage.pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO memory_states (user_key, item_id, stability, difficulty, state, reps, lapses, scheduled_days, elapsed_days, due, last_review, updated_at) VALUES ('alice', 'review-1', 10.0, 5.0, 'review', 3, 0, 10, 0, ?, ?, ?)",
        )
        .bind(now)
        .bind(now - Duration::days(10))
        .bind(now)
        .execute(&storage.pool)
        .await
        .unwrap();

        // A shared LIMIT of 1 ordered by due ASC would return only the
        // earliest-due LEARNING row and starve the REVIEW row entirely.
        // Each state group must be queried (and limited) independently.
        let due = storage
            .query_items_due("alice", "ru", -5.0, 5.0, &["review", "relearning"], 1)
            .await
            .unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].item.id, "review-1");

        let learning = storage
            .query_items_due("alice", "ru", -5.0, 5.0, &["learning"], 1)
            .await
            .unwrap();
        assert_eq!(learning.len(), 1);
    }

    #[tokio::test]
    async fn placement_session_roundtrips() {
        let storage = SqliteStorage::new(test_pool().await);
        let session = storage
            .create_placement_session("alice", "ru", 0.0, 1.0)
            .await
            .unwrap();

        storage
            .update_placement_session(&session.id, session.next_seq, 0.5, 0.85, 1, None, None)
            .await
            .unwrap();

        let fetched = storage
            .get_placement_session(&session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.items_completed, 1);
        assert!((fetched.theta - 0.5).abs() < 1e-9);
        assert!(!fetched.is_complete);
        assert_eq!(fetched.next_seq, session.next_seq + 1);

        // A stale expected_seq (submission arriving out of order) is rejected.
        let stale = storage
            .update_placement_session(&session.id, session.next_seq, 0.6, 0.8, 2, None, None)
            .await;
        assert!(stale.is_err());
    }
}
