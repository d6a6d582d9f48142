//! Demo-mode fixture data (spec §4.K route table, SPEC_FULL.md §4
//! "Demo mode"): `/courses`, `/courses/{id}/items`, and
//! `/courses/{id}/materials` fall back to this fixed dataset when the
//! demo user has no real rows yet, so a fresh deployment has something to
//! show immediately.
//!
//! Grounded on `runtime.py`'s `_load_fixtures`/`_handle_courses`/
//! `_handle_course_items`, reimplemented as an embedded JSON asset instead
//! of files on disk — this workspace carries no `fixtures/` directory.

use std::sync::LazyLock;

use gurt_domain::{CanvasItem, Course};
use serde::{Deserialize, Serialize};

const FIXTURES_JSON: &str = include_str!("../../../demos/fixtures.json");

/// A mirrored-file summary with the fields `/courses/{id}/materials`
/// actually returns (`downloadUrl` and `s3Key` are stripped — spec §4.K).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialSummary {
    #[serde(rename = "canvasFileId")]
    pub canvas_file_id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    #[serde(rename = "sizeBytes")]
    pub size_bytes: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<&gurt_domain::CanvasMaterial> for MaterialSummary {
    fn from(material: &gurt_domain::CanvasMaterial) -> Self {
        Self {
            canvas_file_id: material.canvas_file_id.clone(),
            course_id: material.course_id.clone(),
            display_name: material.display_name.clone(),
            content_type: material.content_type.clone(),
            size_bytes: material.size_bytes,
            updated_at: material.updated_at.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Fixtures {
    courses: Vec<Course>,
    items: Vec<CanvasItem>,
    materials: Vec<MaterialSummary>,
}

static FIXTURES: LazyLock<Fixtures> = LazyLock::new(|| {
    serde_json::from_str(FIXTURES_JSON).expect("demos/fixtures.json is well-formed and matches the wire schema")
});

pub fn courses() -> Vec<Course> {
    FIXTURES.courses.clone()
}

pub fn items_for_course(course_id: &str) -> Vec<CanvasItem> {
    FIXTURES.items.iter().filter(|item| item.course_id == course_id).cloned().collect()
}

pub fn materials_for_course(course_id: &str) -> Vec<MaterialSummary> {
    FIXTURES.materials.iter().filter(|m| m.course_id == course_id).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_parse_and_are_non_empty() {
        assert!(!courses().is_empty());
        for course in courses() {
            course.validate().expect("fixture course must satisfy the model's own validation");
        }
    }

    #[test]
    fn items_filter_by_course() {
        let all_course_ids: std::collections::HashSet<_> = courses().into_iter().map(|c| c.id).collect();
        for course_id in &all_course_ids {
            for item in items_for_course(course_id) {
                item.validate().expect("fixture item must satisfy the model's own validation");
                assert_eq!(&item.course_id, course_id);
            }
        }
    }
}
