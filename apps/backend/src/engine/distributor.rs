//! Contextual Credit Distributor
//!
//! Given a sentence, a target word, and a learner rating, classifies each
//! surviving token's role and emits per-word credit directing the
//! Scheduler to update supporting words alongside the primary one. Pure;
//! does not invoke the Scheduler itself — the caller does, once per
//! credited word.

use crate::models::{CefrLevel, Rating};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditType {
    Primary,
    Supporting,
    Structural,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordCredit {
    pub word: String,
    pub credit_type: CreditType,
    pub multiplier: f64,
    pub adjusted_rating: Rating,
}

/// Lowercase, strip `.`/`,`, split on whitespace. A placeholder
/// tokenizer — a production system would plug a morphological analyzer
/// here (see the module-level note in SPEC_FULL's design notes).
pub fn tokenize(sentence: &str, basic_words: &[&str]) -> Vec<String> {
    sentence
        .to_lowercase()
        .replace(['.', ','], "")
        .split_whitespace()
        .filter(|w| !basic_words.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn classify(
    word: &str,
    target: &str,
    cefr: CefrLevel,
    structural_words: &[&str],
    frequency_rank: Option<u32>,
) -> CreditType {
    if word == target {
        return CreditType::Primary;
    }
    if structural_words.contains(&word) {
        return CreditType::Structural;
    }
    let is_advanced = matches!(cefr, CefrLevel::B2 | CefrLevel::C1 | CefrLevel::C2);
    if is_advanced && frequency_rank.is_some_and(|rank| rank <= 100) {
        return CreditType::Structural;
    }
    CreditType::Supporting
}

fn base_multiplier(credit_type: CreditType) -> f64 {
    match credit_type {
        CreditType::Primary => 1.0,
        CreditType::Supporting => 0.6,
        CreditType::Structural => 0.2,
    }
}

/// Apply the rating-conditioned adjustment and clamp to [0, 1]. Returns
/// `None` when the multiplier drops to 0 (word is dropped).
fn adjusted_multiplier(credit_type: CreditType, rating: Rating) -> Option<f64> {
    let mut m = base_multiplier(credit_type);
    match rating {
        Rating::Again => {
            if credit_type == CreditType::Supporting {
                m *= 0.3;
            } else if credit_type == CreditType::Structural {
                m = 0.0;
            }
        }
        Rating::Easy if credit_type == CreditType::Supporting => {
            m *= 1.2;
        }
        _ => {}
    }
    m = m.clamp(0.0, 1.0);
    if m == 0.0 {
        None
    } else {
        Some(m)
    }
}

fn adjusted_rating(base_rating: Rating, credit_type: CreditType) -> Rating {
    if credit_type == CreditType::Primary {
        return base_rating;
    }
    // EASY on the primary becomes GOOD on supporting/structural words.
    if base_rating == Rating::Easy {
        Rating::Good
    } else {
        base_rating
    }
}

/// Distribute contextual credit across the meaningful words of
/// `sentence`. The primary word always yields exactly one credit entry;
/// `target` not appearing among the tokens is a programmer error.
pub fn distribute(
    sentence: &str,
    target: &str,
    rating: Rating,
    cefr: CefrLevel,
    basic_words: &[&str],
    structural_words: &[&str],
    frequency_ranks: &dyn Fn(&str) -> Option<u32>,
) -> Vec<WordCredit> {
    let words = tokenize(sentence, basic_words);
    assert!(
        words.iter().any(|w| w == target),
        "target word must appear among the sentence's surviving tokens"
    );

    let mut credits = Vec::new();
    for word in words {
        let credit_type = classify(&word, target, cefr, structural_words, frequency_ranks(&word));
        let Some(multiplier) = adjusted_multiplier(credit_type, rating) else {
            continue;
        };
        credits.push(WordCredit {
            word,
            credit_type,
            multiplier,
            adjusted_rating: adjusted_rating(rating, credit_type),
        });
    }
    credits
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUSSIAN_BASIC: &[&str] = &["я", "ты", "он", "она", "мы", "вы", "они", "в", "на", "и", "а", "но"];
    const RUSSIAN_STRUCTURAL: &[&str] = &["не", "то", "это", "что", "как", "где", "когда", "почему"];

    fn no_freq(_: &str) -> Option<u32> {
        None
    }

    #[test]
    fn distributor_easy_on_supporting() {
        let credits = distribute(
            "Моя мать читает интересную книгу",
            "читает",
            Rating::Easy,
            CefrLevel::A2,
            RUSSIAN_BASIC,
            RUSSIAN_STRUCTURAL,
            &no_freq,
        );

        let primary = credits
            .iter()
            .find(|c| c.word == "читает")
            .expect("primary credit present");
        assert_eq!(primary.credit_type, CreditType::Primary);
        assert_eq!(primary.adjusted_rating, Rating::Easy);
        assert_eq!(primary.multiplier, 1.0);

        for word in ["мать", "интересную", "книгу"] {
            let c = credits.iter().find(|c| c.word == word).unwrap();
            assert_eq!(c.credit_type, CreditType::Supporting);
            assert!((c.multiplier - 0.72).abs() < 1e-9);
            assert_eq!(c.adjusted_rating, Rating::Good);
        }
    }

    #[test]
    fn primary_keeps_rating_and_full_multiplier() {
        for rating in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy] {
            let credits = distribute(
                "книга интересная",
                "книга",
                rating,
                CefrLevel::B1,
                &[],
                &[],
                &no_freq,
            );
            let primary = credits.iter().find(|c| c.word == "книга").unwrap();
            assert_eq!(primary.adjusted_rating, rating);
            assert_eq!(primary.multiplier, 1.0);
        }
    }

    #[test]
    fn again_drops_all_structural_credit() {
        let credits = distribute(
            "это книга интересная",
            "книга",
            Rating::Again,
            CefrLevel::B1,
            &[],
            RUSSIAN_STRUCTURAL,
            &no_freq,
        );
        assert!(!credits.iter().any(|c| c.credit_type == CreditType::Structural));
    }

    #[test]
    fn multipliers_always_in_unit_interval() {
        for rating in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy] {
            let credits = distribute(
                "это интересная книга и еще слово",
                "книга",
                rating,
                CefrLevel::C1,
                &[],
                RUSSIAN_STRUCTURAL,
                &|w| if w == "слово" { Some(50) } else { None },
            );
            for c in credits {
                assert!(c.multiplier >= 0.0 && c.multiplier <= 1.0);
            }
        }
    }

    #[test]
    fn high_frequency_words_become_structural_for_advanced_learners() {
        let credits = distribute(
            "слово книга",
            "книга",
            Rating::Good,
            CefrLevel::B2,
            &[],
            &[],
            &|w| if w == "слово" { Some(10) } else { None },
        );
        let c = credits.iter().find(|c| c.word == "слово").unwrap();
        assert_eq!(c.credit_type, CreditType::Structural);
    }
}
