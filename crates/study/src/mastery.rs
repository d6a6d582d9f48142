//! `GET /study/mastery` (spec §4.I).

use chrono::{DateTime, Utc};
use gurt_domain::DomainError;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::ports::{CardStore, StudyCardRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicMastery {
    #[serde(rename = "topicId")]
    pub topic_id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "masteryLevel")]
    pub mastery_level: f64,
    #[serde(rename = "dueCards")]
    pub due_cards: usize,
}

fn mastery_of(card: &StudyCardRow) -> f64 {
    card.fsrs_state
        .as_ref()
        .map(|s| (s.stability / 10.0).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Group `cards` by topic, computing mean mastery and due-card counts as
/// of `now`, sorted by `topicId` (spec §4.I).
pub fn topic_mastery(course_id: &str, cards: &[StudyCardRow], now: DateTime<Utc>) -> Vec<TopicMastery> {
    let mut by_topic: BTreeMap<&str, Vec<&StudyCardRow>> = BTreeMap::new();
    for card in cards {
        by_topic.entry(card.topic_id.as_str()).or_default().push(card);
    }

    by_topic
        .into_iter()
        .map(|(topic_id, topic_cards)| {
            let mean = topic_cards.iter().map(|c| mastery_of(c)).sum::<f64>() / topic_cards.len().max(1) as f64;
            let due_cards = topic_cards
                .iter()
                .filter(|c| c.due_at().is_none_or(|d| d <= now))
                .count();
            TopicMastery {
                topic_id: topic_id.to_string(),
                course_id: course_id.to_string(),
                mastery_level: round4(mean),
                due_cards,
            }
        })
        .collect()
}

/// Fetch a course's cards and compute mastery per topic.
pub async fn topic_mastery_for_course(
    card_store: &dyn CardStore,
    course_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<TopicMastery>, DomainError> {
    let cards = card_store.list_for_course(course_id).await?;
    Ok(topic_mastery(course_id, &cards, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gurt_fsrs::FsrsState;

    fn card(id: &str, topic: &str, stability: f64, due_at: DateTime<Utc>) -> StudyCardRow {
        StudyCardRow {
            id: id.to_string(),
            course_id: "c1".to_string(),
            topic_id: topic.to_string(),
            prompt: "p".to_string(),
            answer: "a".to_string(),
            fsrs_state: Some(FsrsState {
                due_at,
                stability,
                difficulty: 5.0,
                reps: 1,
                lapses: 0,
                last_reviewed_at: due_at,
            }),
        }
    }

    #[test]
    fn groups_and_sorts_by_topic_id() {
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap();
        let cards = vec![
            card("c1", "topic-b", 5.0, now - chrono::Duration::days(1)),
            card("c2", "topic-a", 10.0, now + chrono::Duration::days(1)),
        ];
        let rows = topic_mastery("c1", &cards, now);
        assert_eq!(rows[0].topic_id, "topic-a");
        assert_eq!(rows[0].mastery_level, 1.0);
        assert_eq!(rows[0].due_cards, 0);
        assert_eq!(rows[1].topic_id, "topic-b");
        assert_eq!(rows[1].due_cards, 1);
    }
}
