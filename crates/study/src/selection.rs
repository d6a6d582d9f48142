//! `/study/today` selection (spec §4.I steps 1-6).

use chrono::{DateTime, Duration, Utc};
use gurt_domain::DomainError;

use crate::ports::{CardStore, ExamWindowSource, StudyCardRow};

const NEAR_EXAM_WINDOW_DAYS: i64 = 7;
const LOW_MASTERY_THRESHOLD: f64 = 0.5;
const DEFAULT_COUNT: usize = 5;
const MAX_COUNT: usize = 50;

/// Sort key for a card's due date: a missing `fsrsState` sorts last, not
/// first, matching the original's `"9999-12-31T23:59:59+00:00"` sentinel.
fn sort_due_at(card: &StudyCardRow) -> DateTime<Utc> {
    card.due_at().unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn mastery_of(card: &StudyCardRow) -> f64 {
    card.fsrs_state
        .as_ref()
        .map(|s| (s.stability / 10.0).clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

/// Mean mastery per topic over `cards`; a card with no `fsrs_state` counts
/// as 0 mastery (spec §4.I step 4).
fn mastery_by_topic(cards: &[StudyCardRow]) -> std::collections::HashMap<String, f64> {
    let mut sums: std::collections::HashMap<String, (f64, usize)> = std::collections::HashMap::new();
    for card in cards {
        let entry = sums.entry(card.topic_id.clone()).or_insert((0.0, 0));
        entry.0 += mastery_of(card);
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(topic, (sum, count))| (topic, sum / count.max(1) as f64))
        .collect()
}

/// Resolve the exam window's `dueAt`: an explicit `examId` is looked up by
/// id; otherwise the nearest future exam-type item's `dueAt` wins.
pub fn resolve_exam_due_at(
    exam_items: &[(String, DateTime<Utc>)],
    exam_id: Option<&str>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if let Some(exam_id) = exam_id {
        return exam_items
            .iter()
            .find(|(id, _)| id == exam_id)
            .map(|(_, due_at)| *due_at);
    }

    exam_items
        .iter()
        .filter(|(_, due_at)| *due_at >= now)
        .min_by(|(id_a, due_a), (id_b, due_b)| (due_a, id_a).cmp(&(due_b, id_b)))
        .map(|(_, due_at)| *due_at)
}

/// Pure selection logic (spec §4.I steps 1-6), given the full set of a
/// course's cards and the resolved exam due date (if any).
pub fn study_today(
    cards: &[StudyCardRow],
    exam_due_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<StudyCardRow> {
    if cards.is_empty() {
        return Vec::new();
    }

    let mut sorted_cards: Vec<&StudyCardRow> = cards.iter().collect();
    sorted_cards.sort_by(|a, b| (sort_due_at(a), &a.id).cmp(&(sort_due_at(b), &b.id)));

    let mut due: Vec<&StudyCardRow> = sorted_cards
        .iter()
        .copied()
        .filter(|c| c.due_at().is_none_or(|d| d <= now))
        .collect();
    due.sort_by(|a, b| (sort_due_at(a), &a.id).cmp(&(sort_due_at(b), &b.id)));

    let due_ids: std::collections::HashSet<&str> = due.iter().map(|c| c.id.as_str()).collect();

    let mut chosen: Vec<&StudyCardRow> = due.clone();

    let near_exam = exam_due_at.is_some_and(|due_at| {
        let delta = due_at - now;
        delta >= Duration::zero() && delta <= Duration::days(NEAR_EXAM_WINDOW_DAYS)
    });

    if near_exam {
        let mastery = mastery_by_topic(cards);
        let mut boosters: Vec<&StudyCardRow> = sorted_cards
            .iter()
            .copied()
            .filter(|c| !due_ids.contains(c.id.as_str()))
            .filter(|c| mastery.get(&c.topic_id).copied().unwrap_or(0.0) < LOW_MASTERY_THRESHOLD)
            .collect();
        boosters.sort_by(|a, b| {
            let ma = mastery.get(&a.topic_id).copied().unwrap_or(0.0);
            let mb = mastery.get(&b.topic_id).copied().unwrap_or(0.0);
            (ma, sort_due_at(a), &a.id)
                .partial_cmp(&(mb, sort_due_at(b), &b.id))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        chosen.extend(boosters);
    }

    if chosen.is_empty() {
        chosen = sorted_cards.iter().copied().take(DEFAULT_COUNT).collect();
    }

    chosen.into_iter().take(MAX_COUNT).cloned().collect()
}

/// Full orchestration: fetch cards + exam items, then apply pure
/// selection. Canvas item lookup is best-effort: if it fails, study
/// selection falls back to no exam-window context rather than erroring.
pub async fn study_today_for_course(
    card_store: &dyn CardStore,
    exam_source: &dyn ExamWindowSource,
    course_id: &str,
    exam_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<StudyCardRow>, DomainError> {
    let cards = card_store.list_for_course(course_id).await?;
    let exam_items = exam_source
        .exam_due_dates(course_id)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(course_id, %err, "study.today.exam_lookup_failed");
            Vec::new()
        });
    let exam_due_at = resolve_exam_due_at(&exam_items, exam_id, now);
    Ok(study_today(&cards, exam_due_at, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gurt_fsrs::FsrsState;

    fn dt(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 0, 0, 0).unwrap()
    }

    fn card(id: &str, topic: &str, stability: f64, due_at: Option<DateTime<Utc>>) -> StudyCardRow {
        StudyCardRow {
            id: id.to_string(),
            course_id: "c1".to_string(),
            topic_id: topic.to_string(),
            prompt: "p".to_string(),
            answer: "a".to_string(),
            fsrs_state: due_at.map(|due_at| FsrsState {
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
    fn near_exam_booster_scenario_matches_spec_scenario_five() {
        let now = dt(2026, 9, 1);
        let d1 = card("D1", "HIGH", 9.0, Some(now - Duration::days(1)));
        let d2 = card("D2", "HIGH", 9.0, Some(now - Duration::days(1)));
        let b1 = card("B1", "LOW", 1.0, Some(now + Duration::days(10)));
        let b2 = card("B2", "LOW", 1.0, Some(now + Duration::days(10)));
        let high_non_due = card("H3", "HIGH", 9.0, Some(now + Duration::days(10)));
        let cards = vec![d1, d2, b1, b2, high_non_due];

        let near = study_today(&cards, Some(now + Duration::days(3)), now);
        assert_eq!(
            near.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
            vec!["D1", "D2", "B1", "B2"]
        );

        let far = study_today(&cards, Some(now + Duration::days(14)), now);
        assert_eq!(
            far.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
            vec!["D1", "D2"]
        );
    }

    #[test]
    fn falls_back_to_first_five_when_nothing_due_and_no_exam() {
        let now = dt(2026, 9, 1);
        let cards: Vec<StudyCardRow> = (0..8)
            .map(|i| card(&format!("c{i}"), "T", 5.0, Some(now + Duration::days(5))))
            .collect();
        let chosen = study_today(&cards, None, now);
        assert_eq!(chosen.len(), 5);
    }

    #[test]
    fn cards_with_no_fsrs_state_are_always_due() {
        let now = dt(2026, 9, 1);
        let cards = vec![card("c1", "T", 5.0, None)];
        let chosen = study_today(&cards, None, now);
        assert_eq!(chosen.len(), 1);
    }

    #[test]
    fn never_reviewed_cards_sort_after_overdue_cards_with_due_dates() {
        let now = dt(2026, 9, 1);
        let overdue = card("overdue", "T", 5.0, Some(now - Duration::days(1)));
        let never_reviewed = card("never-reviewed", "T", 5.0, None);
        let cards = vec![never_reviewed, overdue];

        let chosen = study_today(&cards, None, now);
        assert_eq!(
            chosen.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
            vec!["overdue", "never-reviewed"]
        );
    }

    #[test]
    fn resolve_exam_due_at_prefers_explicit_exam_id() {
        let items = vec![
            ("e1".to_string(), dt(2026, 9, 10)),
            ("e2".to_string(), dt(2026, 9, 20)),
        ];
        let now = dt(2026, 9, 1);
        assert_eq!(resolve_exam_due_at(&items, Some("e2"), now), Some(dt(2026, 9, 20)));
        assert_eq!(resolve_exam_due_at(&items, None, now), Some(dt(2026, 9, 10)));
    }
}
