//! iCalendar serializer: stable UIDs, time-window resolution, CRLF output
//! (spec §4.J).

use chrono::{DateTime, Duration, Utc};
use gurt_domain::keys::calendar_event_uid;

const PRODID: &str = "-//StudyBuddy//Calendar 1.0//EN";

/// One schedulable item, as seen by the calendar feed builder.
#[derive(Debug, Clone)]
pub struct ScheduleItem {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub due_at: DateTime<Utc>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

fn ics_datetime(value: DateTime<Utc>) -> String {
    value.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Resolve the `(DTSTART, DTEND)` window for an item: honor `startAt`/
/// `endAt` verbatim when present, default both to `dueAt`, and push
/// `DTEND` to `DTSTART + 60min` whenever the window would be zero-length
/// or inverted.
fn resolve_window(item: &ScheduleItem) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = item.start_at.unwrap_or(item.due_at);
    let mut end = item.end_at.unwrap_or(item.due_at);
    if end <= start {
        end = start + Duration::minutes(60);
    }
    (start, end)
}

fn escape_line(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

/// Serialize a single user's schedule items into an iCalendar document
/// with CRLF line endings. Items are emitted in the order given.
pub fn build_calendar(user_id: &str, items: &[ScheduleItem]) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODID}"),
    ];

    for item in items {
        let (start, end) = resolve_window(item);
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!(
            "UID:{}",
            calendar_event_uid(user_id, &item.course_id, &item.id)
        ));
        lines.push(format!("DTSTAMP:{}", ics_datetime(item.due_at)));
        lines.push(format!("DTSTART:{}", ics_datetime(start)));
        lines.push(format!("DTEND:{}", ics_datetime(end)));
        lines.push(format!("SUMMARY:{}", escape_line(&item.title)));
        lines.push(format!("DESCRIPTION:Course {}", item.course_id));
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());
    lines.join("\r\n") + "\r\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: &str, title: &str, due_at: DateTime<Utc>) -> ScheduleItem {
        ScheduleItem {
            id: id.to_string(),
            course_id: "170880".to_string(),
            title: title.to_string(),
            due_at,
            start_at: None,
            end_at: None,
        }
    }

    #[test]
    fn uid_is_stable_under_title_and_due_at_changes() {
        let due_a = Utc.with_ymd_and_hms(2026, 9, 1, 10, 15, 0).unwrap();
        let due_b = Utc.with_ymd_and_hms(2026, 9, 5, 8, 0, 0).unwrap();
        let snapshot_a = build_calendar("u1", &[item("i1", "Essay Draft", due_a)]);
        let snapshot_b = build_calendar("u1", &[item("i1", "Essay Final", due_b)]);

        let uid_line = |cal: &str| cal.lines().find(|l| l.starts_with("UID:")).unwrap().to_string();
        assert_eq!(uid_line(&snapshot_a), uid_line(&snapshot_b));

        let dtstart_line = |cal: &str| cal.lines().find(|l| l.starts_with("DTSTART:")).unwrap().to_string();
        assert_ne!(dtstart_line(&snapshot_a), dtstart_line(&snapshot_b));
    }

    #[test]
    fn default_window_is_due_at_to_due_at_plus_60_minutes() {
        let due = Utc.with_ymd_and_hms(2026, 9, 1, 10, 15, 0).unwrap();
        let (start, end) = resolve_window(&item("i1", "HW1", due));
        assert_eq!(start, due);
        assert_eq!(end, due + Duration::minutes(60));
    }

    #[test]
    fn honors_explicit_non_degenerate_window() {
        let due = Utc.with_ymd_and_hms(2026, 9, 1, 10, 15, 0).unwrap();
        let mut i = item("i1", "Review Session", due);
        i.start_at = Some(Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap());
        i.end_at = Some(Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap());
        let (start, end) = resolve_window(&i);
        assert_eq!(start, i.start_at.unwrap());
        assert_eq!(end, i.end_at.unwrap());
    }

    #[test]
    fn pushes_end_forward_when_window_is_inverted() {
        let due = Utc.with_ymd_and_hms(2026, 9, 1, 10, 15, 0).unwrap();
        let mut i = item("i1", "Odd Window", due);
        i.start_at = Some(due);
        i.end_at = Some(due - Duration::minutes(5));
        let (start, end) = resolve_window(&i);
        assert_eq!(end, start + Duration::minutes(60));
    }

    #[test]
    fn output_uses_crlf_line_endings() {
        let due = Utc.with_ymd_and_hms(2026, 9, 1, 10, 15, 0).unwrap();
        let cal = build_calendar("u1", &[item("i1", "HW1", due)]);
        assert!(cal.contains("\r\n"));
        assert!(cal.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn escapes_embedded_newlines_in_title() {
        let due = Utc.with_ymd_and_hms(2026, 9, 1, 10, 15, 0).unwrap();
        let cal = build_calendar("u1", &[item("i1", "Line1\nLine2\r\nLine3", due)]);
        assert!(cal.contains("SUMMARY:Line1 Line2  Line3"));
    }
}
