use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::learner::CefrLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementSession {
    pub id: String,
    pub user_key: String,
    pub language: String,
    pub theta: f64,
    pub se: f64,
    pub items_completed: i32,
    pub is_complete: bool,
    pub final_cefr: Option<CefrLevel>,
    pub next_seq: i32,
}

impl PlacementSession {
    pub fn start(
        id: impl Into<String>,
        user_key: impl Into<String>,
        language: impl Into<String>,
        theta: f64,
        se: f64,
    ) -> Self {
        Self {
            id: id.into(),
            user_key: user_key.into(),
            language: language.into(),
            theta,
            se,
            items_completed: 0,
            is_complete: false,
            final_cefr: None,
            next_seq: 0,
        }
    }
}

/// One logged response within a placement session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementResponseLog {
    pub session_id: String,
    pub item_id: String,
    pub rating: i32,
    pub theta_before: f64,
    pub theta_after: f64,
    pub se_before: f64,
    pub se_after: f64,
    pub correct: bool,
    pub response_time_ms: Option<i64>,
    pub answered_at: DateTime<Utc>,
}
