//! `/study/today` selection, `/study/review` persistence, and
//! `/study/mastery` aggregation (spec §4.I).

pub mod mastery;
pub mod ports;
pub mod review;
pub mod selection;

pub use mastery::{topic_mastery, TopicMastery};
pub use ports::{CardStore, ExamWindowSource, StudyCardRow};
pub use review::{fsrs_rating_from_review_rating, record_review, ReviewPayload, ReviewResult};
pub use selection::{resolve_exam_due_at, study_today, study_today_for_course};
