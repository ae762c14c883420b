//! Session Composer
//!
//! Ranks and assembles a review batch from due, learning, and new items,
//! constrained to a band around the learner's ability. Pure: the caller
//! supplies the already-queried candidate lists (the storage adapter's
//! `query_items_*` calls), this module only ranks and band-filters.

use crate::models::{CefrLevel, Item};

/// The [lo, hi] band of theta allowed for priority tiers 1-3.
pub fn band(cefr: CefrLevel) -> (f64, f64) {
    let target = cefr.theta();
    (target - 1.0, target + 1.0)
}

fn in_band(item: &Item, lo: f64, hi: f64) -> bool {
    match item.theta_item() {
        Some(theta) => theta >= lo && theta <= hi,
        None => false,
    }
}

/// A due REVIEW/RELEARNING candidate. The caller (storage query) is
/// responsible for due-ascending order; tier 1 consumes it as given.
pub struct DueCandidate {
    pub item: Item,
}

/// A LEARNING candidate, ordered by due ascending (tier 2).
pub struct LearningCandidate {
    pub item: Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Due,
    Learning,
    New,
    Overflow,
}

pub struct ComposedItem {
    pub item: Item,
    pub tier: Tier,
}

pub struct Breakdown {
    pub due: usize,
    pub learning: usize,
    pub new: usize,
    pub total: usize,
}

/// Compose up to `count` items for a review batch.
///
/// `due`/`learning` must already be in due-ascending order; `new`/
/// `overflow` are consumed in the (random or otherwise pre-shuffled)
/// order the caller supplies — composer does not reorder within a tier.
pub fn compose(
    count: usize,
    cefr: CefrLevel,
    due: Vec<DueCandidate>,
    learning: Vec<LearningCandidate>,
    new_items: Vec<Item>,
    overflow: Vec<Item>,
) -> (Vec<ComposedItem>, Breakdown) {
    let (lo, hi) = band(cefr);
    let mut chosen = Vec::with_capacity(count);
    let mut chosen_ids = std::collections::HashSet::new();
    let mut due_count = 0;
    let mut learning_count = 0;
    let mut new_count = 0;

    for candidate in due {
        if chosen.len() >= count {
            break;
        }
        if !in_band(&candidate.item, lo, hi) {
            continue;
        }
        chosen_ids.insert(candidate.item.id.clone());
        due_count += 1;
        chosen.push(ComposedItem {
            item: candidate.item,
            tier: Tier::Due,
        });
    }

    for candidate in learning {
        if chosen.len() >= count {
            break;
        }
        if !in_band(&candidate.item, lo, hi) {
            continue;
        }
        chosen_ids.insert(candidate.item.id.clone());
        learning_count += 1;
        chosen.push(ComposedItem {
            item: candidate.item,
            tier: Tier::Learning,
        });
    }

    for item in new_items {
        if chosen.len() >= count {
            break;
        }
        if !in_band(&item, lo, hi) || chosen_ids.contains(&item.id) {
            continue;
        }
        chosen_ids.insert(item.id.clone());
        new_count += 1;
        chosen.push(ComposedItem {
            item,
            tier: Tier::New,
        });
    }

    for item in overflow {
        if chosen.len() >= count {
            break;
        }
        if chosen_ids.contains(&item.id) {
            continue;
        }
        chosen_ids.insert(item.id.clone());
        chosen.push(ComposedItem {
            item,
            tier: Tier::Overflow,
        });
    }

    let total = chosen.len();
    (
        chosen,
        Breakdown {
            due: due_count,
            learning: learning_count,
            new: new_count,
            total,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemPayload, ItemType};

    fn item(id: &str, theta: Option<f64>) -> Item {
        Item {
            id: id.to_string(),
            language: "ru".to_string(),
            item_type: ItemType::Vocabulary,
            payload: ItemPayload {
                target_word: id.to_string(),
                theta_item: theta,
                answer: None,
                sentence: None,
            },
        }
    }

    #[test]
    fn composer_empty_band_falls_back_to_overflow() {
        let (chosen, breakdown) = compose(
            5,
            CefrLevel::B1,
            vec![],
            vec![],
            vec![],
            vec![item("x", Some(5.0))],
        );
        assert_eq!(breakdown.due, 0);
        assert_eq!(breakdown.learning, 0);
        assert_eq!(breakdown.new, 0);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].tier, Tier::Overflow);
    }

    #[test]
    fn composer_empty_pool_returns_zero_items() {
        let (chosen, breakdown) = compose(5, CefrLevel::B1, vec![], vec![], vec![], vec![]);
        assert!(chosen.is_empty());
        assert_eq!(breakdown.total, 0);
    }

    #[test]
    fn composer_fills_tiers_in_priority_order() {
        let due = vec![DueCandidate {
            item: item("d1", Some(0.0)),
        }];
        let learning = vec![LearningCandidate {
            item: item("l1", Some(0.0)),
        }];
        let new_items = vec![item("n1", Some(0.0))];
        let overflow = vec![item("o1", None)];

        let (chosen, breakdown) = compose(2, CefrLevel::B1, due, learning, new_items, overflow);
        assert_eq!(breakdown.total, 2);
        assert_eq!(chosen[0].item.id, "d1");
        assert_eq!(chosen[1].item.id, "l1");
    }

    #[test]
    fn composer_excludes_out_of_band_items_from_priority_tiers() {
        let new_items = vec![item("far", Some(3.0)), item("near", Some(0.2))];
        let (chosen, breakdown) = compose(5, CefrLevel::B1, vec![], vec![], new_items, vec![]);
        assert_eq!(breakdown.new, 1);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].item.id, "near");
    }
}
