//! `POST /study/review` (spec §4.I).

use chrono::{DateTime, Utc};
use gurt_domain::DomainError;
use gurt_fsrs::{schedule_review, FsrsState, Rating};
use serde::{Deserialize, Serialize};

use crate::ports::CardStore;

/// Validated `{cardId, courseId, rating, reviewedAt}` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewPayload {
    #[serde(rename = "cardId")]
    pub card_id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub rating: u8,
    #[serde(rename = "reviewedAt")]
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResult {
    pub accepted: bool,
}

/// Map the API's `1..=5` rating onto FSRS's `1..=4` range by clamping the
/// top end (spec §9 Open Question: "5 maps to 4").
pub fn fsrs_rating_from_review_rating(rating: u8) -> Rating {
    let clamped = rating.clamp(1, 4);
    Rating::new(clamped).expect("clamp(1,4) is always a valid rating")
}

/// Apply an FSRS update to a card's prior state and persist it. Last
/// write wins: the prior state observed is whatever the store currently
/// holds (spec §5 ordering guarantee).
pub async fn record_review(
    card_store: &dyn CardStore,
    payload: &ReviewPayload,
) -> Result<ReviewResult, DomainError> {
    if payload.card_id.trim().is_empty() {
        return Err(DomainError::Validation("cardId is required".to_string()));
    }
    if payload.course_id.trim().is_empty() {
        return Err(DomainError::Validation("courseId is required".to_string()));
    }
    if !(1..=5).contains(&payload.rating) {
        return Err(DomainError::Validation(
            "rating must be an integer between 1 and 5".to_string(),
        ));
    }

    let card = card_store
        .get(&payload.card_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("card {}", payload.card_id)))?;
    if card.course_id != payload.course_id {
        return Err(DomainError::NotFound(format!("card {}", payload.card_id)));
    }

    let rating = fsrs_rating_from_review_rating(payload.rating);
    let next: FsrsState = schedule_review(card.fsrs_state.as_ref(), rating, payload.reviewed_at);
    card_store.save_review(&payload.card_id, &next).await?;

    Ok(ReviewResult { accepted: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StudyCardRow;
    use async_trait::async_trait;

    #[test]
    fn rating_five_maps_to_four() {
        assert_eq!(fsrs_rating_from_review_rating(5).get(), 4);
        assert_eq!(fsrs_rating_from_review_rating(1).get(), 1);
        assert_eq!(fsrs_rating_from_review_rating(3).get(), 3);
    }

    struct StubCardStore;

    #[async_trait]
    impl CardStore for StubCardStore {
        async fn list_for_course(&self, _course_id: &str) -> Result<Vec<StudyCardRow>, DomainError> {
            Ok(Vec::new())
        }

        async fn get(&self, _card_id: &str) -> Result<Option<StudyCardRow>, DomainError> {
            panic!("validation should reject the payload before any store lookup");
        }

        async fn save_review(&self, _card_id: &str, _fsrs_state: &FsrsState) -> Result<(), DomainError> {
            panic!("validation should reject the payload before any store write");
        }
    }

    fn payload(card_id: &str, course_id: &str, rating: u8) -> ReviewPayload {
        ReviewPayload {
            card_id: card_id.to_string(),
            course_id: course_id.to_string(),
            rating,
            reviewed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rejects_rating_below_one() {
        let err = record_review(&StubCardStore, &payload("c1", "course1", 0)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_rating_above_five() {
        let err = record_review(&StubCardStore, &payload("c1", "course1", 6)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_empty_card_id() {
        let err = record_review(&StubCardStore, &payload("", "course1", 3)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_empty_course_id() {
        let err = record_review(&StubCardStore, &payload("c1", "", 3)).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
