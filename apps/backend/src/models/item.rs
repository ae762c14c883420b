use serde::{Deserialize, Serialize};

/// Immutable content unit. Items are shared and read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub language: String,
    pub item_type: ItemType,
    pub payload: ItemPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Vocabulary,
    Cloze,
    Sentence,
}

impl From<String> for ItemType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "vocabulary" => ItemType::Vocabulary,
            "cloze" => ItemType::Cloze,
            "sentence" => ItemType::Sentence,
            _ => ItemType::Vocabulary,
        }
    }
}

impl From<ItemType> for String {
    fn from(value: ItemType) -> Self {
        match value {
            ItemType::Vocabulary => "vocabulary".to_string(),
            ItemType::Cloze => "cloze".to_string(),
            ItemType::Sentence => "sentence".to_string(),
        }
    }
}

/// Type-specific item content. Items used by the placement engine carry
/// a `theta_item`; items used only by the session composer may omit it,
/// but then cannot be band-filtered and are treated as overflow-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPayload {
    pub target_word: String,
    pub theta_item: Option<f64>,
    /// Expected answer for cloze/vocabulary items.
    pub answer: Option<String>,
    /// Full sentence text, present for sentence items.
    pub sentence: Option<String>,
}

impl Item {
    pub fn theta_item(&self) -> Option<f64> {
        self.payload.theta_item
    }
}
