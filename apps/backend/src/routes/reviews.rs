use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::wordlists;
use crate::engine::distributor;
use crate::engine::scheduler;
use crate::error::AppResult;
use crate::models::{MemoryState, Rating};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", post(submit_reviews))
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub user: String,
    pub item_id: String,
    pub rating: i32,
    pub response_time_ms: Option<i64>,
}

#[derive(Serialize)]
pub struct UpdatedMemory {
    pub item_id: String,
    pub state: String,
    pub stability: f64,
    pub difficulty: f64,
    pub due: chrono::DateTime<Utc>,
    pub credited_words: Vec<String>,
}

#[derive(Serialize)]
pub struct ReviewError {
    pub item_id: String,
    pub error: String,
}

#[derive(Serialize)]
pub struct BatchReviewResult {
    pub updated: Vec<UpdatedMemory>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ReviewError>,
}

/// No per-word frequency table is wired up yet; B2+ frequency-based
/// structural reclassification is reachable but always sees `None`.
fn no_frequency_data(_word: &str) -> Option<u32> {
    None
}

async fn apply_one_rating(
    state: &AppState,
    user: &str,
    item_id: &str,
    rating: Rating,
    response_time_ms: Option<i64>,
) -> AppResult<UpdatedMemory> {
    let now = Utc::now();
    let memory = state
        .storage
        .get_memory(user, item_id)
        .await?
        .unwrap_or_else(|| MemoryState::new(now));

    let (next, log) =
        scheduler::schedule_with_log(user, item_id, &memory, rating, now, response_time_ms);
    state.storage.upsert_memory(user, item_id, &next).await?;
    state
        .storage
        .append_review_log(user, item_id, log.rating, log.response_time_ms, log.reviewed_at)
        .await?;

    Ok(UpdatedMemory {
        item_id: item_id.to_string(),
        state: next.state.into(),
        stability: next.stability,
        difficulty: next.difficulty,
        due: next.due,
        credited_words: Vec::new(),
    })
}

async fn submit_reviews(
    State(state): State<Arc<AppState>>,
    Json(requests): Json<Vec<ReviewRequest>>,
) -> AppResult<Json<BatchReviewResult>> {
    let mut updated = Vec::new();
    let mut errors = Vec::new();

    for req in requests {
        let rating = match Rating::try_from(req.rating) {
            Ok(r) => r,
            Err(e) => {
                errors.push(ReviewError {
                    item_id: req.item_id,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let item = match state.storage.get_item(&req.item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                errors.push(ReviewError {
                    item_id: req.item_id,
                    error: "unknown item".to_string(),
                });
                continue;
            }
            Err(e) => {
                errors.push(ReviewError {
                    item_id: req.item_id,
                    error: e.to_string(),
                });
                continue;
            }
        };

        let primary = apply_one_rating(
            &state,
            &req.user,
            &req.item_id,
            rating,
            req.response_time_ms,
        )
        .await;
        let mut primary = match primary {
            Ok(u) => u,
            Err(e) => {
                errors.push(ReviewError {
                    item_id: req.item_id.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        if let Some(sentence) = item.payload.sentence.as_deref() {
            let learner = state.storage.get_learner(&req.user).await?;
            let basic = wordlists::basic_words(&item.language);
            let structural = wordlists::structural_words(&item.language);
            let credits = distributor::distribute(
                sentence,
                &item.payload.target_word,
                rating,
                learner.cefr,
                basic,
                structural,
                &no_frequency_data,
            );

            for credit in credits {
                if credit.word == item.payload.target_word {
                    continue;
                }
                let Some(word_item) = state
                    .storage
                    .find_item_by_word(&item.language, &credit.word)
                    .await?
                else {
                    continue;
                };
                if apply_one_rating(
                    &state,
                    &req.user,
                    &word_item.id,
                    credit.adjusted_rating,
                    None,
                )
                .await
                .is_ok()
                {
                    primary.credited_words.push(credit.word);
                }
            }
        }

        updated.push(primary);
    }

    Ok(Json(BatchReviewResult { updated, errors }))
}
