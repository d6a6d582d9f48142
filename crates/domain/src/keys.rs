//! Stable partition/sort key constructors (spec §3).
//!
//! These are pure string-building functions, not literal storage primary
//! keys — `gurt-storage` backs entities with relational tables, but the
//! derived strings here are kept as the stable identities used for ICS
//! UIDs, canonical object-store keys, and secondary sort ordering, exactly
//! as the original single-table design intended.

use regex::Regex;
use std::sync::LazyLock;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));

/// Shared partition key for all course rows belonging to a user.
pub fn course_partition_key(user_id: &str) -> String {
    format!("USER#{user_id}")
}

/// Sort key for a single course row.
pub fn course_sort_key(course_id: &str) -> String {
    format!("COURSE#{course_id}")
}

/// Partition key for all canvas items under a user+course.
pub fn item_partition_key(user_id: &str, course_id: &str) -> String {
    format!("USER#{user_id}#COURSE#{course_id}")
}

/// Stable sort key per item, independent of due-date changes.
pub fn item_sort_key(item_id: &str) -> String {
    format!("ITEM#{item_id}")
}

/// Due-date-sortable key for course-level upcoming item queries.
pub fn item_due_sort_key(due_at: &str, item_id: &str) -> String {
    format!("DUE#{due_at}#ITEM#{item_id}")
}

/// Due-date-sortable key for user-wide upcoming item queries.
pub fn user_due_sort_key(due_at: &str, course_id: &str, item_id: &str) -> String {
    format!("DUE#{due_at}#COURSE#{course_id}#ITEM#{item_id}")
}

/// Canvas connection key pair: fixed partition + sort key, one per user.
pub fn canvas_connection_keys(user_id: &str) -> (String, &'static str) {
    (format!("USER#{user_id}"), "CANVAS_CONNECTION#default")
}

/// Replace runs of non-`[A-Za-z0-9._-]` characters with `_`, trim leading
/// and trailing dots/underscores, and fall back to `"material"` when the
/// result is empty.
pub fn safe_material_filename(display_name: &str) -> String {
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(display_name, "_");
    let trimmed = replaced.trim_matches(['.', '_']);
    if trimmed.is_empty() {
        "material".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Canonical object-store key for an LMS-mirrored material.
pub fn material_object_key(
    user_id: &str,
    course_id: &str,
    canvas_file_id: &str,
    display_name: &str,
) -> String {
    format!(
        "uploads/canvas-materials/{user_id}/{course_id}/{canvas_file_id}/{}",
        safe_material_filename(display_name)
    )
}

/// Canonical object-store key for a directly uploaded document.
pub fn upload_object_key(course_id: &str, doc_id: &str, filename: &str) -> String {
    format!("uploads/{course_id}/{doc_id}/{filename}")
}

/// Stable iCalendar UID, invariant under title/dueAt/startAt/endAt changes.
pub fn calendar_event_uid(user_id: &str, course_id: &str, item_id: &str) -> String {
    format!("studybuddy:{user_id}:{course_id}:{item_id}")
}

/// `true` iff `source` (an object-store key or `s3://`-style URI) is
/// in-scope for `course_id`: after stripping an optional `uploads/` prefix
/// it begins with `{course_id}/` or `canvas-materials/{anyUser}/{course_id}/`.
pub fn source_in_course_scope(source: &str, course_id: &str) -> bool {
    let key = match strip_uri_scheme(source) {
        Some(key) => key,
        None => source,
    };
    let mut parts = key.split('/').filter(|p| !p.is_empty());
    let Some(first) = parts.next() else {
        return false;
    };
    let (first, mut parts) = if first == "uploads" {
        match parts.next() {
            Some(next) => (next, parts),
            None => return false,
        }
    } else {
        (first, parts)
    };

    if first == "canvas-materials" {
        parts.next().is_some() && parts.next() == Some(course_id)
    } else {
        first == course_id
    }
}

fn strip_uri_scheme(source: &str) -> Option<&str> {
    let rest = source.strip_prefix("s3://")?;
    let slash = rest.find('/')?;
    Some(&rest[slash + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_sort_key_is_stable_under_due_date() {
        assert_eq!(item_sort_key("abc"), "ITEM#abc");
    }

    #[test]
    fn safe_material_filename_replaces_unsafe_runs() {
        assert_eq!(safe_material_filename("Lecture Notes (1).pdf"), "Lecture_Notes_1_.pdf");
        assert_eq!(safe_material_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(safe_material_filename("..."), "material");
    }

    #[test]
    fn safe_material_filename_trims_both_ends() {
        assert_eq!(safe_material_filename("Chapter 1."), "Chapter_1");
        assert_eq!(safe_material_filename("notes.txt "), "notes.txt");
        assert_eq!(safe_material_filename(".hidden_"), "hidden");
    }

    #[test]
    fn material_object_key_matches_canonical_layout() {
        assert_eq!(
            material_object_key("u1", "c1", "f1", "notes.pdf"),
            "uploads/canvas-materials/u1/c1/f1/notes.pdf"
        );
    }

    #[test]
    fn calendar_uid_is_stable() {
        assert_eq!(
            calendar_event_uid("u1", "c1", "i1"),
            "studybuddy:u1:c1:i1"
        );
    }

    #[test]
    fn scope_check_matches_direct_upload_and_canvas_material_layouts() {
        assert!(source_in_course_scope("s3://bucket/170880/doc1/f.pdf", "170880"));
        assert!(source_in_course_scope(
            "s3://bucket/uploads/170880/doc1/f.pdf",
            "170880"
        ));
        assert!(source_in_course_scope(
            "s3://bucket/canvas-materials/u1/170880/f1/n.pdf",
            "170880"
        ));
        assert!(!source_in_course_scope(
            "s3://bucket/424242/doc1/f.pdf",
            "170880"
        ));
        assert!(!source_in_course_scope("s3://bucket/", "170880"));
    }

    #[test]
    fn scope_check_accepts_bare_keys_without_a_scheme() {
        assert!(source_in_course_scope("170880/doc1/f.pdf", "170880"));
    }
}
