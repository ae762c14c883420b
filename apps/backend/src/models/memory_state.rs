use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardState {
    New,
    Learning,
    Review,
    Relearning,
}

impl From<String> for CardState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "new" => CardState::New,
            "learning" => CardState::Learning,
            "review" => CardState::Review,
            "relearning" => CardState::Relearning,
            _ => CardState::New,
        }
    }
}

impl From<CardState> for String {
    fn from(value: CardState) -> Self {
        match value {
            CardState::New => "new".to_string(),
            CardState::Learning => "learning".to_string(),
            CardState::Review => "review".to_string(),
            CardState::Relearning => "relearning".to_string(),
        }
    }
}

/// Per (learner, item) scheduling state owned by the Scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryState {
    pub stability: f64,
    pub difficulty: f64,
    pub state: CardState,
    pub reps: i32,
    pub lapses: i32,
    pub scheduled_days: i32,
    pub elapsed_days: i32,
    pub due: DateTime<Utc>,
    pub last_review: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// The lazily-created state of a card that has never been reviewed.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            stability: 0.0,
            difficulty: 0.0,
            state: CardState::New,
            reps: 0,
            lapses: 0,
            scheduled_days: 0,
            elapsed_days: 0,
            due: now,
            last_review: None,
        }
    }
}
