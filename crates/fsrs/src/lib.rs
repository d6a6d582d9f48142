//! Pure FSRS-style spaced-repetition scheduler.
//!
//! No I/O, no clock reads — `now` is always supplied by the caller so the
//! whole module stays deterministic and testable without mocking time.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_DIFFICULTY: f64 = 5.0;
const MIN_STABILITY: f64 = 0.15;
const MAX_DIFFICULTY: f64 = 10.0;
const MIN_DIFFICULTY: f64 = 1.0;
const RELEARN_INTERVAL_DAYS: f64 = 4.0 / 24.0;

fn first_stability(rating: u8) -> f64 {
    match rating {
        1 => 0.30,
        2 => 0.80,
        3 => 2.50,
        _ => 4.00,
    }
}

fn first_difficulty_delta(rating: u8) -> f64 {
    match rating {
        1 => 1.20,
        2 => 0.40,
        3 => -0.30,
        _ => -0.80,
    }
}

fn first_interval_days(rating: u8) -> f64 {
    match rating {
        1 => 0.0,
        2 => 1.0 / 24.0,
        3 => 1.0,
        _ => 3.0,
    }
}

fn review_difficulty_delta(rating: u8) -> f64 {
    match rating {
        1 => 1.00,
        2 => 0.30,
        3 => -0.15,
        _ => -0.45,
    }
}

fn review_interval_factor(rating: u8) -> f64 {
    match rating {
        2 => 0.80,
        3 => 1.00,
        _ => 1.35,
    }
}

fn retrievability(stability: f64, elapsed_days: f64) -> f64 {
    (1.0 + elapsed_days / stability.max(MIN_STABILITY)).recip()
}

fn clamp_difficulty(value: f64) -> f64 {
    value.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive()
        .and_hms_opt(ts.time().hour(), ts.time().minute(), ts.time().second())
        .map(|naive| naive.and_utc())
        .unwrap_or(ts)
}

/// Review rating, restricted to the four values FSRS defines.
///
/// `/study/review` accepts a wider `1..=5` range at the API boundary; callers
/// map `5` down to `4` before constructing a `Rating` (see `gurt-study`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Rating(u8);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("rating must be in 1..=4, got {0}")]
pub struct InvalidRating(pub u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, InvalidRating> {
        if (1..=4).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidRating(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// The scheduler's output (and the prior state fed into the next review).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FsrsState {
    pub due_at: DateTime<Utc>,
    pub stability: f64,
    pub difficulty: f64,
    pub reps: u32,
    pub lapses: u32,
    pub last_reviewed_at: DateTime<Utc>,
}

fn first_review(now: DateTime<Utc>, rating: Rating) -> FsrsState {
    let rating = rating.get();
    let stability = first_stability(rating);
    let difficulty = clamp_difficulty(DEFAULT_DIFFICULTY + first_difficulty_delta(rating));
    let interval_days = first_interval_days(rating);
    let now = truncate_to_seconds(now);
    FsrsState {
        due_at: now + chrono::Duration::seconds((interval_days * 86400.0).round() as i64),
        stability: round6(stability),
        difficulty: round6(difficulty),
        reps: 1,
        lapses: if rating == 1 { 1 } else { 0 },
        last_reviewed_at: now,
    }
}

/// Compute the next scheduling state from a prior state (or none, for a
/// card's first review), a rating in `1..=4`, and the review instant.
pub fn schedule_review(prior: Option<&FsrsState>, rating: Rating, now: DateTime<Utc>) -> FsrsState {
    let now = truncate_to_seconds(now);
    let Some(prior) = prior else {
        return first_review(now, rating);
    };

    let r = rating.get();
    let elapsed_days =
        ((now - prior.last_reviewed_at).num_seconds() as f64 / 86400.0).max(0.0);
    let retrievability = retrievability(prior.stability, elapsed_days);
    let retention_gap = (1.0 - retrievability).max(0.0);

    let (next_stability, interval_days, lapses, difficulty_delta) = if r == 1 {
        let next_stability = (prior.stability * 0.55).max(MIN_STABILITY);
        (
            next_stability,
            RELEARN_INTERVAL_DAYS,
            prior.lapses + 1,
            review_difficulty_delta(1),
        )
    } else {
        let gain = 1.0
            + (0.25 + 0.08 * r as f64) * (1.0 + retention_gap) * ((11.0 - prior.difficulty) / 10.0);
        let next_stability = (prior.stability * gain).max(MIN_STABILITY);
        let interval_days = next_stability * review_interval_factor(r);
        let difficulty_delta = review_difficulty_delta(r) * (1.0 + retention_gap * 0.5);
        (next_stability, interval_days, prior.lapses, difficulty_delta)
    };

    let next_difficulty = clamp_difficulty(prior.difficulty + difficulty_delta);

    FsrsState {
        due_at: now + chrono::Duration::seconds((interval_days * 86400.0).round() as i64),
        stability: round6(next_stability),
        difficulty: round6(next_difficulty),
        reps: prior.reps + 1,
        lapses,
        last_reviewed_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn rejects_out_of_range_ratings() {
        assert_eq!(Rating::new(0), Err(InvalidRating(0)));
        assert_eq!(Rating::new(5), Err(InvalidRating(5)));
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(4).is_ok());
    }

    #[test]
    fn first_review_good_matches_spec_scenario_one() {
        let state = schedule_review(None, Rating::new(3).unwrap(), dt("2026-09-01T10:15:00Z"));
        assert_eq!(state.due_at, dt("2026-09-02T10:15:00Z"));
        assert_eq!(state.stability, 2.5);
        assert_eq!(state.difficulty, 4.7);
        assert_eq!(state.reps, 1);
        assert_eq!(state.lapses, 0);
        assert_eq!(state.last_reviewed_at, dt("2026-09-01T10:15:00Z"));
    }

    #[test]
    fn lapse_after_two_good_matches_spec_scenario_two() {
        let s1 = schedule_review(None, Rating::new(3).unwrap(), dt("2026-09-01T10:15:00Z"));
        let s2 = schedule_review(Some(&s1), Rating::new(4).unwrap(), dt("2026-09-04T10:15:00Z"));
        let s3 = schedule_review(Some(&s2), Rating::new(1).unwrap(), dt("2026-09-09T10:15:00Z"));

        assert_eq!(s3.due_at, dt("2026-09-09T14:15:00Z"));
        assert_eq!(s3.stability, 2.138088);
        assert_eq!(s3.difficulty, 5.127273);
        assert_eq!(s3.reps, 3);
        assert_eq!(s3.lapses, 1);
        assert_eq!(s3.last_reviewed_at, dt("2026-09-09T10:15:00Z"));
    }

    #[test]
    fn stability_never_drops_below_floor() {
        let prior = FsrsState {
            due_at: dt("2026-01-01T00:00:00Z"),
            stability: 0.16,
            difficulty: 5.0,
            reps: 1,
            lapses: 0,
            last_reviewed_at: dt("2026-01-01T00:00:00Z"),
        };
        let next = schedule_review(Some(&prior), Rating::new(1).unwrap(), dt("2026-01-02T00:00:00Z"));
        assert!(next.stability >= 0.15);
    }

    #[test]
    fn difficulty_stays_within_bounds_across_many_lapses() {
        let mut state = schedule_review(None, Rating::new(1).unwrap(), dt("2026-01-01T00:00:00Z"));
        let mut now = dt("2026-01-01T00:00:00Z");
        for _ in 0..20 {
            now += chrono::Duration::hours(1);
            state = schedule_review(Some(&state), Rating::new(1).unwrap(), now);
            assert!((1.0..=10.0).contains(&state.difficulty));
        }
    }

    #[test]
    fn reps_and_lapses_counters_track_history() {
        let s1 = schedule_review(None, Rating::new(2).unwrap(), dt("2026-01-01T00:00:00Z"));
        assert_eq!(s1.reps, 1);
        let s2 = schedule_review(Some(&s1), Rating::new(1).unwrap(), dt("2026-01-02T00:00:00Z"));
        assert_eq!(s2.reps, 2);
        assert_eq!(s2.lapses, 1);
        let s3 = schedule_review(Some(&s2), Rating::new(4).unwrap(), dt("2026-01-03T00:00:00Z"));
        assert_eq!(s3.reps, 3);
        assert_eq!(s3.lapses, 1);
    }
}
