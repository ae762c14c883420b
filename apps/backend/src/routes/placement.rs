use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::placement::{self, PlacementCandidate};
use crate::error::{AppError, AppResult};
use crate::models::{CefrLevel, PlacementResponseLog, Rating};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start", post(start_placement))
        .route("/answer", post(answer_placement))
        .route("/:id", axum::routing::delete(cancel_placement))
}

#[derive(Deserialize)]
pub struct StartRequest {
    pub user: String,
    pub language: String,
    pub claimed_level: Option<CefrLevel>,
}

#[derive(Serialize)]
pub struct Progress {
    pub items_completed: i32,
    pub estimated_level: String,
    pub ci: (f64, f64),
}

#[derive(Serialize)]
pub struct PlacementItemView {
    pub item_id: String,
    pub item_type: String,
    pub target_word: String,
    pub sentence: Option<String>,
}

#[derive(Serialize)]
pub struct StartResponse {
    pub session_id: String,
    pub item: PlacementItemView,
    pub progress: Progress,
}

async fn next_candidate(
    state: &AppState,
    language: &str,
    theta: f64,
    exclude_ids: &[String],
) -> AppResult<Option<crate::models::Item>> {
    let candidates = state
        .storage
        .query_placement_candidates(language, exclude_ids, 200)
        .await?;
    let placement_candidates: Vec<PlacementCandidate> = candidates
        .iter()
        .filter_map(|item| {
            item.theta_item().map(|theta_item| PlacementCandidate {
                item_id: item.id.clone(),
                theta_item,
            })
        })
        .collect();

    let Some(selected) = placement::select_next_item(theta, &placement_candidates) else {
        return Ok(None);
    };
    Ok(candidates.into_iter().find(|i| i.id == selected.item_id))
}

async fn start_placement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartRequest>,
) -> AppResult<Json<StartResponse>> {
    let theta = req
        .claimed_level
        .map(|level| level.theta())
        .unwrap_or(0.0);

    let item = next_candidate(&state, &req.language, theta, &[])
        .await?
        .ok_or(AppError::NoPlacementItems)?;

    let session = state
        .storage
        .create_placement_session(&req.user, &req.language, theta, placement::INITIAL_SE)
        .await?;

    Ok(Json(StartResponse {
        session_id: session.id,
        item: PlacementItemView {
            item_id: item.id,
            item_type: item.item_type.into(),
            target_word: item.payload.target_word,
            sentence: item.payload.sentence,
        },
        progress: Progress {
            items_completed: 0,
            estimated_level: CefrLevel::from_theta(theta).into(),
            ci: placement::confidence_interval(theta, placement::INITIAL_SE),
        },
    }))
}

#[derive(Deserialize)]
pub struct AnswerRequest {
    pub session_id: String,
    pub item_id: String,
    pub user_answer: String,
    pub response_time_ms: Option<i64>,
}

#[derive(Serialize)]
pub struct Feedback {
    pub was_correct: bool,
    pub correct_answer: Option<String>,
}

#[derive(Serialize)]
pub struct Results {
    pub cefr_level: String,
    pub theta: f64,
    pub ci: (f64, f64),
    pub items_completed: i32,
    pub known_words: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum AnswerResponse {
    InProgress {
        complete: bool,
        item: PlacementItemView,
        feedback: Feedback,
        progress: Progress,
    },
    Complete {
        complete: bool,
        results: Results,
    },
}

async fn answer_placement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> AppResult<Json<AnswerResponse>> {
    let session = state
        .storage
        .get_placement_session(&req.session_id)
        .await?
        .ok_or_else(|| AppError::SessionUnavailable {
            id: req.session_id.clone(),
        })?;
    if session.is_complete {
        return Err(AppError::SessionUnavailable {
            id: req.session_id,
        });
    }

    let item = state
        .storage
        .get_item(&req.item_id)
        .await?
        .ok_or_else(|| AppError::UnknownItem {
            id: req.item_id.clone(),
        })?;
    let theta_item = item.theta_item().ok_or_else(|| AppError::UnknownItem {
        id: req.item_id.clone(),
    })?;

    let rating_value: i32 = req
        .user_answer
        .parse()
        .map_err(|_| AppError::InvalidRating(0))?;
    let rating = Rating::try_from(rating_value)?;

    let update = placement::update_ability(session.theta, session.se, theta_item, rating);
    let items_completed = session.items_completed + 1;

    let log = PlacementResponseLog {
        session_id: session.id.clone(),
        item_id: req.item_id.clone(),
        rating: rating.as_i32(),
        theta_before: session.theta,
        theta_after: update.theta,
        se_before: session.se,
        se_after: update.se,
        correct: update.correct,
        response_time_ms: req.response_time_ms,
        answered_at: chrono::Utc::now(),
    };
    state.storage.append_placement_response(&log).await?;

    let next_item =
        next_candidate(&state, &session.language, update.theta, std::slice::from_ref(&req.item_id))
            .await?;
    let pool_empty = next_item.is_none();
    let should_stop = placement::should_stop(update.se, items_completed, pool_empty);

    if should_stop {
        let final_cefr = placement::final_cefr(update.theta);
        state
            .storage
            .update_placement_session(
                &session.id,
                session.next_seq,
                update.theta,
                update.se,
                items_completed,
                Some(true),
                Some(final_cefr),
            )
            .await?;
        state
            .storage
            .upsert_learner(
                &session.user_key,
                final_cefr,
                update.theta,
                Some(chrono::Utc::now()),
            )
            .await?;

        return Ok(Json(AnswerResponse::Complete {
            complete: true,
            results: Results {
                cefr_level: final_cefr.into(),
                theta: update.theta,
                ci: placement::confidence_interval(update.theta, update.se),
                items_completed,
                known_words: placement::known_words(final_cefr),
            },
        }));
    }

    state
        .storage
        .update_placement_session(
            &session.id,
            session.next_seq,
            update.theta,
            update.se,
            items_completed,
            None,
            None,
        )
        .await?;

    let next_item = next_item.ok_or(AppError::NoPlacementItems)?;
    Ok(Json(AnswerResponse::InProgress {
        complete: false,
        item: PlacementItemView {
            item_id: next_item.id,
            item_type: next_item.item_type.into(),
            target_word: next_item.payload.target_word,
            sentence: next_item.payload.sentence,
        },
        feedback: Feedback {
            was_correct: update.correct,
            correct_answer: item.payload.answer,
        },
        progress: Progress {
            items_completed,
            estimated_level: CefrLevel::from_theta(update.theta).into(),
            ci: placement::confidence_interval(update.theta, update.se),
        },
    }))
}

async fn cancel_placement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let session = state
        .storage
        .get_placement_session(&id)
        .await?
        .ok_or_else(|| AppError::SessionUnavailable { id: id.clone() })?;

    let final_cefr = placement::final_cefr(session.theta);
    state
        .storage
        .update_placement_session(
            &id,
            session.next_seq,
            session.theta,
            session.se,
            session.items_completed,
            Some(true),
            Some(final_cefr),
        )
        .await?;

    Ok(Json(serde_json::json!({
        "complete": true,
        "cefr_level": String::from(final_cefr),
        "theta": session.theta,
    })))
}
