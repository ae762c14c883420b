use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The learner's 4-point response to a review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum Rating {
    Again = 1,
    Hard = 2,
    Good = 3,
    Easy = 4,
}

impl Rating {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Rating {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Rating::Again),
            2 => Ok(Rating::Hard),
            3 => Ok(Rating::Good),
            4 => Ok(Rating::Easy),
            other => Err(AppError::InvalidRating(other)),
        }
    }
}

/// Append-only history of a single review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub user_key: String,
    pub item_id: String,
    pub rating: Rating,
    pub response_time_ms: Option<i64>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewLogEntry {
    pub fn new(
        user_key: impl Into<String>,
        item_id: impl Into<String>,
        rating: Rating,
        response_time_ms: Option<i64>,
    ) -> Self {
        Self {
            user_key: user_key.into(),
            item_id: item_id.into(),
            rating,
            response_time_ms,
            reviewed_at: Utc::now(),
        }
    }
}
