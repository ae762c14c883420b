use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::composer::{self, DueCandidate, LearningCandidate, Tier};
use crate::error::AppResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/next", post(next_session))
}

#[derive(Deserialize)]
pub struct NextSessionRequest {
    pub user: String,
    pub language: String,
    pub count: usize,
}

#[derive(Serialize)]
pub struct SessionItem {
    pub item_id: String,
    pub item_type: String,
    pub target_word: String,
    pub sentence: Option<String>,
    pub tier: String,
}

#[derive(Serialize)]
pub struct SessionBreakdown {
    pub due: usize,
    pub learning: usize,
    pub new: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct SessionBatch {
    pub items: Vec<SessionItem>,
    pub user_cefr: String,
    pub breakdown: SessionBreakdown,
    pub band: (f64, f64),
}

fn tier_name(tier: Tier) -> &'static str {
    match tier {
        Tier::Due => "due",
        Tier::Learning => "learning",
        Tier::New => "new",
        Tier::Overflow => "overflow",
    }
}

async fn next_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NextSessionRequest>,
) -> AppResult<Json<SessionBatch>> {
    let learner = state.storage.get_learner(&req.user).await?;
    let (lo, hi) = composer::band(learner.cefr);

    // Tier 1 (due REVIEW/RELEARNING) and tier 2 (LEARNING) are fetched with
    // separate queries, each carrying its own limit, so a glut of
    // early-due LEARNING rows can never starve tier 1 out of a shared
    // LIMIT before the composer gets a chance to prioritize it.
    let due_rows = state
        .storage
        .query_items_due(&req.user, &req.language, lo, hi, &["review", "relearning"], req.count as i64)
        .await?;
    let learning_rows = state
        .storage
        .query_items_due(&req.user, &req.language, lo, hi, &["learning"], req.count as i64)
        .await?;
    let due = due_rows
        .into_iter()
        .map(|row| DueCandidate { item: row.item })
        .collect();
    let learning = learning_rows
        .into_iter()
        .map(|row| LearningCandidate { item: row.item })
        .collect();

    let new_items = state
        .storage
        .query_items_new(&req.user, &req.language, lo, hi, req.count as i64)
        .await?;

    let overflow = state
        .storage
        .query_items_any(&req.language, &[], req.count as i64)
        .await?;

    let (chosen, breakdown) =
        composer::compose(req.count, learner.cefr, due, learning, new_items, overflow);

    let items = chosen
        .into_iter()
        .map(|composed| SessionItem {
            item_id: composed.item.id,
            item_type: composed.item.item_type.into(),
            target_word: composed.item.payload.target_word,
            sentence: composed.item.payload.sentence,
            tier: tier_name(composed.tier).to_string(),
        })
        .collect();

    Ok(Json(SessionBatch {
        items,
        user_cefr: learner.cefr.into(),
        breakdown: SessionBreakdown {
            due: breakdown.due,
            learning: breakdown.learning,
            new: breakdown.new,
            total: breakdown.total,
        },
        band: (lo, hi),
    }))
}
