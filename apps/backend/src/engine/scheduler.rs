//! FSRS v4 Scheduler
//!
//! Pure per-card state transition: given a memory state, a rating, and a
//! timestamp, produces the next memory state and a review-log entry.
//! Takes values in, returns values out; owns no storage handle.

use chrono::{DateTime, Duration, Utc};

use crate::models::{CardState, MemoryState, Rating, ReviewLogEntry};

/// FSRS v4 default weight vector, embedded verbatim.
pub const W: [f64; 19] = [
    0.4072, 1.1829, 3.1262, 15.4722, 7.2102, 0.5316, 1.0651, 0.0234, 1.616, 0.1544, 1.0824, 1.9813,
    0.0953, 0.2975, 2.2042, 0.2407, 2.9466, 0.5034, 1.6567,
];

const LEARNING_STEP_MINUTES: i64 = 1;
const LEARNING_STEP_LAST_MINUTES: i64 = 10;
const RELEARNING_STEP_MINUTES: i64 = 10;
const GRADUATING_INTERVAL_GOOD_DAYS: i64 = 1;
const GRADUATING_INTERVAL_EASY_DAYS: i64 = 4;
const MAXIMUM_INTERVAL_DAYS: i64 = 36_500;
const HARD_INTERVAL_FACTOR: f64 = 1.2;

/// Clamp helper mirroring `f64::clamp` but tolerant of NaN callers never produce.
fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    x.max(lo).min(hi)
}

/// Initial difficulty for ratings HARD, GOOD, EASY: `w[4] - w[r+3]`.
/// Not meaningful for AGAIN — on a NEW card rated AGAIN the source falls
/// back to GOOD's initial difficulty (see `schedule_new`), an observed
/// behavior preserved here rather than reference FSRS.
fn initial_difficulty(rating: Rating) -> f64 {
    let d = match rating {
        Rating::Again => W[4] - W[6],
        Rating::Hard => W[4] - W[5],
        Rating::Good => W[4] - W[6],
        Rating::Easy => W[4] - W[7],
    };
    clamp(d, 1.0, 10.0)
}

fn initial_stability(rating: Rating) -> f64 {
    let idx = rating.as_i32() as usize - 1;
    W[idx].max(0.1)
}

/// Retrievability: modeled probability of recall at `elapsed_days`.
fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    if stability <= 0.0 {
        return 0.0;
    }
    (1.0 + elapsed_days / (9.0 * stability)).powf(-1.0)
}

fn next_stability(stability: f64, difficulty: f64, elapsed_days: f64, rating: Rating) -> f64 {
    let r = retrievability(elapsed_days, stability);
    let s_new = if rating == Rating::Again {
        W[8] * difficulty.powf(-W[9]) * ((stability + 1.0).powf(W[10]) - 1.0)
            * ((1.0 - r) * W[11]).exp()
    } else {
        let g = rating.as_i32() as f64;
        stability
            * (W[12].exp() * (11.0 - difficulty) * stability.powf(-W[13])
                * (((g - 3.0) * W[14]).exp() - 1.0)
                * r
                + 1.0)
    };
    clamp(s_new, 0.1, MAXIMUM_INTERVAL_DAYS as f64)
}

fn next_difficulty(difficulty: f64, rating: Rating) -> f64 {
    let g = rating.as_i32() as f64;
    let mut d = difficulty - W[15] * (g - 3.0);
    d += W[16] * (initial_difficulty(Rating::Good) - difficulty);
    clamp(d, 1.0, 10.0)
}

fn elapsed_days(last_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match last_review {
        None => 0,
        Some(lr) => ((now - lr).num_seconds() / 86_400).max(0),
    }
}

/// Apply `rating` to `state` at `now`, producing the next memory state
/// and a review-log entry. Deterministic, pure, no I/O.
///
/// # Panics
/// Never panics; an invalid rating cannot be constructed (see `Rating`).
pub fn schedule(state: &MemoryState, rating: Rating, now: DateTime<Utc>) -> MemoryState {
    match state.state {
        CardState::New => schedule_new(rating, now),
        CardState::Learning | CardState::Relearning => schedule_learning(state, rating, now),
        CardState::Review => schedule_review(state, rating, now),
    }
}

fn schedule_new(rating: Rating, now: DateTime<Utc>) -> MemoryState {
    let stability = initial_stability(rating);
    let difficulty = initial_difficulty(rating);

    let (card_state, due, scheduled_days, lapses) = match rating {
        Rating::Again => (
            CardState::Learning,
            now + Duration::minutes(LEARNING_STEP_MINUTES),
            0,
            1,
        ),
        Rating::Hard => (
            CardState::Learning,
            now + Duration::minutes(LEARNING_STEP_LAST_MINUTES),
            0,
            0,
        ),
        Rating::Good => (
            CardState::Review,
            now + Duration::days(GRADUATING_INTERVAL_GOOD_DAYS),
            GRADUATING_INTERVAL_GOOD_DAYS as i32,
            0,
        ),
        Rating::Easy => (
            CardState::Review,
            now + Duration::days(GRADUATING_INTERVAL_EASY_DAYS),
            GRADUATING_INTERVAL_EASY_DAYS as i32,
            0,
        ),
    };

    MemoryState {
        stability,
        difficulty,
        state: card_state,
        reps: 1,
        lapses,
        scheduled_days,
        elapsed_days: 0,
        due,
        last_review: Some(now),
    }
}

fn schedule_learning(state: &MemoryState, rating: Rating, now: DateTime<Utc>) -> MemoryState {
    let elapsed = elapsed_days(state.last_review, now);
    let reps = state.reps + 1;

    if rating == Rating::Again {
        return MemoryState {
            stability: state.stability,
            difficulty: state.difficulty,
            state: state.state,
            reps,
            lapses: state.lapses + 1,
            scheduled_days: 0,
            elapsed_days: elapsed as i32,
            due: now + Duration::minutes(LEARNING_STEP_MINUTES),
            last_review: Some(now),
        };
    }

    let was_relearning = state.state == CardState::Relearning;
    let (stability, difficulty, interval_days) = if rating == Rating::Easy {
        if was_relearning {
            let s = next_stability(state.stability, state.difficulty, elapsed as f64, rating);
            let d = next_difficulty(state.difficulty, rating);
            let interval = (s.floor() as i64).max(GRADUATING_INTERVAL_EASY_DAYS);
            (s, d, interval)
        } else {
            (
                state.stability,
                initial_difficulty(rating),
                GRADUATING_INTERVAL_EASY_DAYS,
            )
        }
    } else if was_relearning {
        let s = next_stability(state.stability, state.difficulty, elapsed as f64, rating);
        let d = next_difficulty(state.difficulty, rating);
        let interval = if rating == Rating::Hard {
            ((s * HARD_INTERVAL_FACTOR).floor() as i64).max(1)
        } else {
            (s.floor() as i64).max(1)
        };
        (s, d, interval)
    } else {
        let interval = if rating == Rating::Hard {
            1
        } else {
            GRADUATING_INTERVAL_GOOD_DAYS
        };
        (state.stability, state.difficulty, interval)
    };

    MemoryState {
        stability,
        difficulty,
        state: CardState::Review,
        reps,
        lapses: state.lapses,
        scheduled_days: interval_days as i32,
        elapsed_days: elapsed as i32,
        due: now + Duration::days(interval_days),
        last_review: Some(now),
    }
}

fn schedule_review(state: &MemoryState, rating: Rating, now: DateTime<Utc>) -> MemoryState {
    let elapsed = elapsed_days(state.last_review, now);
    let reps = state.reps + 1;
    let stability = next_stability(state.stability, state.difficulty, elapsed as f64, rating);
    let difficulty = next_difficulty(state.difficulty, rating);

    if rating == Rating::Again {
        return MemoryState {
            stability,
            difficulty,
            state: CardState::Relearning,
            reps,
            lapses: state.lapses + 1,
            scheduled_days: 0,
            elapsed_days: elapsed as i32,
            due: now + Duration::minutes(RELEARNING_STEP_MINUTES),
            last_review: Some(now),
        };
    }

    let interval = if rating == Rating::Hard {
        ((stability * HARD_INTERVAL_FACTOR).floor() as i64).max(1)
    } else {
        (stability.floor() as i64).max(1)
    }
    .min(MAXIMUM_INTERVAL_DAYS);

    MemoryState {
        stability,
        difficulty,
        state: CardState::Review,
        reps,
        lapses: state.lapses,
        scheduled_days: interval as i32,
        elapsed_days: elapsed as i32,
        due: now + Duration::days(interval),
        last_review: Some(now),
    }
}

/// Schedule a card and produce the matching review-log entry in one call.
pub fn schedule_with_log(
    user_key: impl Into<String>,
    item_id: impl Into<String>,
    state: &MemoryState,
    rating: Rating,
    now: DateTime<Utc>,
    response_time_ms: Option<i64>,
) -> (MemoryState, ReviewLogEntry) {
    let next = schedule(state, rating, now);
    let mut log = ReviewLogEntry::new(user_key, item_id, rating, response_time_ms);
    log.reviewed_at = now;
    (next, log)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state(now: DateTime<Utc>) -> MemoryState {
        MemoryState::new(now)
    }

    #[test]
    fn scheduler_new_good() {
        let t = Utc::now();
        let next = schedule(&new_state(t), Rating::Good, t);
        assert_eq!(next.state, CardState::Review);
        assert_eq!(next.scheduled_days, 1);
        assert_eq!(next.due, t + Duration::days(1));
        assert_eq!(next.reps, 1);
        assert_eq!(next.lapses, 0);
        assert!((next.stability - W[2]).abs() < 1e-9);
    }

    #[test]
    fn scheduler_review_again() {
        let last_review = Utc::now() - Duration::days(20);
        let now = last_review + Duration::days(20);
        let state = MemoryState {
            stability: 10.0,
            difficulty: 5.0,
            state: CardState::Review,
            reps: 3,
            lapses: 0,
            scheduled_days: 20,
            elapsed_days: 0,
            due: last_review,
            last_review: Some(last_review),
        };

        let next = schedule(&state, Rating::Again, now);
        assert_eq!(next.state, CardState::Relearning);
        assert_eq!(next.lapses, 1);
        assert_eq!(next.scheduled_days, 0);
        assert_eq!(next.due, now + Duration::minutes(10));

        let r = retrievability(20.0, 10.0);
        assert!((r - 0.8182).abs() < 1e-3);
        let expected_s = W[8]
            * 5f64.powf(-W[9])
            * (11f64.powf(W[10]) - 1.0)
            * ((1.0 - r) * W[11]).exp();
        assert!((next.stability - expected_s).abs() < 1e-6);
    }

    #[test]
    fn difficulty_stays_in_bounds() {
        let t = Utc::now();
        let mut state = schedule(&new_state(t), Rating::Good, t);
        for _ in 0..50 {
            state = schedule(&state, Rating::Again, t);
            assert!(state.difficulty >= 1.0 && state.difficulty <= 10.0);
        }
        let mut state2 = schedule(&new_state(t), Rating::Good, t);
        for _ in 0..50 {
            state2 = schedule(&state2, Rating::Easy, t);
            assert!(state2.difficulty >= 1.0 && state2.difficulty <= 10.0);
        }
    }

    #[test]
    fn again_on_review_always_lapses_and_relearns() {
        let t = Utc::now();
        let state = MemoryState {
            stability: 30.0,
            difficulty: 4.0,
            state: CardState::Review,
            reps: 10,
            lapses: 2,
            scheduled_days: 30,
            elapsed_days: 0,
            due: t,
            last_review: Some(t - Duration::days(30)),
        };
        let next = schedule(&state, Rating::Again, t);
        assert_eq!(next.lapses, 3);
        assert_eq!(next.state, CardState::Relearning);
    }

    #[test]
    fn scheduled_days_zero_iff_not_review() {
        let t = Utc::now();
        for r in [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy] {
            let next = schedule(&new_state(t), r, t);
            let is_review = next.state == CardState::Review;
            assert_eq!(next.scheduled_days == 0, !is_review);
        }
    }

    #[test]
    fn deterministic_reapplication() {
        let t = Utc::now();
        let state = schedule(&new_state(t), Rating::Good, t);
        let a = schedule(&state, Rating::Hard, t + Duration::days(1));
        let b = schedule(&state, Rating::Hard, t + Duration::days(1));
        assert_eq!(a.stability, b.stability);
        assert_eq!(a.difficulty, b.difficulty);
        assert_eq!(a.due, b.due);
    }

    #[test]
    fn learning_easy_carries_stability_forward() {
        let t = Utc::now();
        let state = MemoryState {
            stability: 3.7,
            difficulty: 6.0,
            state: CardState::Learning,
            reps: 1,
            lapses: 0,
            scheduled_days: 0,
            elapsed_days: 0,
            due: t,
            last_review: Some(t),
        };
        let next = schedule(&state, Rating::Easy, t);
        assert_eq!(next.state, CardState::Review);
        assert_eq!(next.stability, state.stability);
        assert!((next.difficulty - initial_difficulty(Rating::Easy)).abs() < 1e-9);
        assert_eq!(next.scheduled_days, GRADUATING_INTERVAL_EASY_DAYS as i32);
    }

    #[test]
    fn stability_monotone_by_rating_strength() {
        // At fixed (D, R) away from AGAIN, EASY >= GOOD >= HARD in stability growth.
        let d = 5.0;
        let r = 0.9;
        let s = 10.0;
        let elapsed = {
            // invert retrievability(elapsed, s) = r for s=10 to get a consistent elapsed
            // r = (1 + e/(9s))^-1 => e = 9s*(1/r - 1)
            9.0 * s * (1.0 / r - 1.0)
        };
        let s_hard = next_stability(s, d, elapsed, Rating::Hard);
        let s_good = next_stability(s, d, elapsed, Rating::Good);
        let s_easy = next_stability(s, d, elapsed, Rating::Easy);
        assert!(s_good >= s_hard - 1e-9);
        assert!(s_easy >= s_good - 1e-9);
    }
}
