//! Adaptive Placement Engine (Computerized Adaptive Testing)
//!
//! IRT-driven CAT: selects items by Fisher information, updates a latent
//! ability estimate with a custom Bayesian-style step (not MLE), and
//! applies the stop rule. Pure; the caller owns session persistence.

use std::collections::HashMap;

use crate::models::{CefrLevel, Rating};

pub const INITIAL_SE: f64 = 1.0;
pub const TARGET_SE: f64 = 0.3;
pub const MIN_ITEMS: i32 = 7;
pub const MAX_ITEMS: i32 = 12;
pub const DISCRIMINATION: f64 = 1.5;
pub const THETA_LO: f64 = -3.0;
pub const THETA_HI: f64 = 4.0;
pub const SE_FLOOR: f64 = 0.1;

/// A candidate item as seen by the placement engine: just enough to
/// select on and to key responses by.
#[derive(Debug, Clone)]
pub struct PlacementCandidate {
    pub item_id: String,
    pub theta_item: f64,
}

/// 2PL response probability.
pub fn probability_correct(theta: f64, theta_item: f64, discrimination: f64) -> f64 {
    let exponent = discrimination * (theta - theta_item);
    1.0 / (1.0 + (-exponent).exp())
}

/// Fisher information I(theta, theta_item) = a^2 * P * (1-P).
pub fn information(theta: f64, theta_item: f64, discrimination: f64) -> f64 {
    let p = probability_correct(theta, theta_item, discrimination);
    discrimination * discrimination * p * (1.0 - p)
}

/// Select the candidate maximizing Fisher information. Ties broken by
/// first-seen order (stable — only a strictly greater information value
/// replaces the current best).
pub fn select_next_item(theta: f64, candidates: &[PlacementCandidate]) -> Option<&PlacementCandidate> {
    let mut best: Option<(&PlacementCandidate, f64)> = None;
    for candidate in candidates {
        let info = information(theta, candidate.theta_item, DISCRIMINATION);
        match &best {
            Some((_, best_info)) if info <= *best_info => {}
            _ => best = Some((candidate, info)),
        }
    }
    best.map(|(c, _)| c)
}

/// The bridge from a 4-point rating to an IRT (correct, confidence) pair.
pub fn rating_to_response(rating: Rating) -> (bool, f64) {
    match rating {
        Rating::Again => (false, 1.0),
        Rating::Hard => (false, 0.7),
        Rating::Good => (true, 0.8),
        Rating::Easy => (true, 1.0),
    }
}

/// Result of applying one response to the running ability estimate.
#[derive(Debug, Clone, Copy)]
pub struct AbilityUpdate {
    pub theta: f64,
    pub se: f64,
    pub correct: bool,
}

/// Advance (theta, se) given a response to an item at `theta_item`.
pub fn update_ability(theta: f64, se: f64, theta_item: f64, rating: Rating) -> AbilityUpdate {
    let (correct, confidence) = rating_to_response(rating);
    let p = probability_correct(theta, theta_item, DISCRIMINATION);
    const BASE_RATE: f64 = 0.5;

    let new_theta = if correct {
        let surprise = 1.0 - p;
        theta + BASE_RATE * surprise * confidence
    } else {
        let surprise = p;
        theta - BASE_RATE * surprise * confidence * 2.0
    };

    AbilityUpdate {
        theta: new_theta.clamp(THETA_LO, THETA_HI),
        se: (se * 0.85).max(SE_FLOOR),
        correct,
    }
}

/// Whether the placement session should stop after `items_completed`
/// responses, given `se` and an empty-pool signal.
pub fn should_stop(se: f64, items_completed: i32, pool_empty: bool) -> bool {
    (items_completed >= MIN_ITEMS && se <= TARGET_SE) || items_completed >= MAX_ITEMS || pool_empty
}

/// Nearest CEFR level by |theta - theta_level|, ties to the lower level.
pub fn final_cefr(theta: f64) -> CefrLevel {
    CefrLevel::from_theta(theta)
}

/// 95% confidence interval around theta.
pub fn confidence_interval(theta: f64, se: f64) -> (f64, f64) {
    let margin = 1.96 * se;
    (theta - margin, theta + margin)
}

/// Cumulative known-word list through `level`: the original source's
/// per-CEFR frequency tables, included for a given `cefr` and every
/// level below it. English-only placeholder table; a production system
/// would key this by language (see the distributor's tokenizer note).
pub fn known_words(cefr: CefrLevel) -> Vec<&'static str> {
    let tables: HashMap<CefrLevel, &[&'static str]> = HashMap::from([
        (
            CefrLevel::A1,
            &[
                "the", "be", "have", "do", "say", "go", "can", "get", "would", "make", "know",
                "will", "think", "take", "see", "come", "could", "want", "look", "use",
            ][..],
        ),
        (
            CefrLevel::A2,
            &[
                "also", "back", "after", "first", "well", "way", "even", "new", "want",
                "because", "any", "these", "give", "day", "most", "us", "is", "water", "than",
                "call",
            ][..],
        ),
        (
            CefrLevel::B1,
            &[
                "through", "just", "form", "sentence", "great", "think", "say", "help", "low",
                "line", "differ", "turn", "cause", "much", "mean", "before", "move", "right",
                "boy", "old",
            ][..],
        ),
        (
            CefrLevel::B2,
            &[
                "however", "therefore", "although", "furthermore", "nevertheless",
                "consequently", "moreover", "whereas", "nonetheless", "hence", "thus",
                "meanwhile", "likewise",
            ][..],
        ),
        (
            CefrLevel::C1,
            &[
                "notwithstanding", "albeit", "hitherto", "erstwhile", "ubiquitous",
                "perspicacious", "inexorable", "surreptitious", "serendipitous",
                "magnanimous", "ephemeral",
            ][..],
        ),
        (
            CefrLevel::C2,
            &[
                "perspicacity", "verisimilitude", "pusillanimous", "sesquipedalian",
                "grandiloquent", "obfuscation", "recondite", "abstruse", "esoteric", "arcane",
                "ineffable",
            ][..],
        ),
    ]);

    let mut words = Vec::new();
    for level in CefrLevel::all() {
        words.extend_from_slice(tables.get(&level).copied().unwrap_or(&[]));
        if level == cefr {
            break;
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_converge() {
        let ratings = [
            Rating::Good,
            Rating::Good,
            Rating::Easy,
            Rating::Hard,
            Rating::Good,
            Rating::Good,
            Rating::Good,
        ];
        let thetas = [0.0, 0.2, 0.4, 0.6, 0.4, 0.6, 0.8];

        let mut theta = 0.0;
        let mut se = INITIAL_SE;
        let mut completed = 0;
        for (rating, theta_item) in ratings.iter().zip(thetas.iter()) {
            let update = update_ability(theta, se, *theta_item, *rating);
            theta = update.theta;
            se = update.se;
            completed += 1;
        }

        assert_eq!(completed, 7);
        assert!((se - 0.321).abs() < 0.01);
        assert!(!should_stop(se, completed, false));

        let update = update_ability(theta, se, 0.5, Rating::Good);
        se = update.se;
        completed += 1;
        assert!(se <= 0.273 + 1e-9);
        assert!(should_stop(se, completed, false));
    }

    #[test]
    fn placement_wrong_heavy() {
        let update = update_ability(0.0, 1.0, 0.0, Rating::Again);
        assert!((update.theta - (-0.5)).abs() < 1e-9);
        assert!((update.se - 0.85).abs() < 1e-9);
    }

    #[test]
    fn theta_step_bounded() {
        let update = update_ability(0.0, 1.0, 10.0, Rating::Again);
        assert!((update.theta - 0.0).abs() <= 1.0 + 1e-9);
    }

    #[test]
    fn se_update_is_exact() {
        let update = update_ability(0.0, 1.0, 0.0, Rating::Good);
        assert!((update.se - 0.85).abs() < 1e-12);
    }

    #[test]
    fn stop_rule_bounds() {
        assert!(!should_stop(0.05, MIN_ITEMS - 1, false));
        assert!(should_stop(0.05, MIN_ITEMS, false));
        assert!(should_stop(10.0, MAX_ITEMS, false));
        assert!(should_stop(10.0, 0, true));
    }

    #[test]
    fn selects_argmax_information_first_seen_tiebreak() {
        let candidates = vec![
            PlacementCandidate { item_id: "a".into(), theta_item: 2.0 },
            PlacementCandidate { item_id: "b".into(), theta_item: 0.0 },
            PlacementCandidate { item_id: "c".into(), theta_item: 0.0 },
        ];
        let selected = select_next_item(0.0, &candidates).unwrap();
        assert_eq!(selected.item_id, "b");
    }

    #[test]
    fn nearest_cefr_ties_go_lower() {
        assert_eq!(final_cefr(0.5), CefrLevel::B1);
    }

    #[test]
    fn known_words_accumulate_through_level() {
        let b1 = known_words(CefrLevel::B1);
        assert!(b1.contains(&"the")); // A1
        assert!(b1.contains(&"also")); // A2
        assert!(b1.contains(&"through")); // B1
        assert!(!b1.contains(&"however")); // B2, should not yet appear
    }
}
