//! LMS (Canvas) HTTP client: paginated GET, normalization, typed errors.

mod pagination;

use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

static EXAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(midterm|final|exam)\b").expect("valid regex"));
static QUIZ_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bquiz\b").expect("valid regex"));

const COURSE_COLOR_PALETTE: [&str; 6] = [
    "#3366FF", "#22AA88", "#CC6655", "#4477AA", "#AA8844", "#1177AA",
];

/// Errors from the LMS HTTP client.
///
/// `AccessDenied` (HTTP 403) is recoverable per-course by spec §4.C: callers
/// skip that course and continue rather than marking the whole user failed.
/// Every other variant is an `ApiError` that marks the enclosing course as
/// failed but does not abort the user's sync.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("canvas access denied (403) for {url}")]
    AccessDenied { url: String },
    #[error("canvas request failed ({status}) for {url}")]
    Api { status: u16, url: String },
    #[error("canvas request transport failure for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("canvas response was not valid JSON for {url}")]
    InvalidJson { url: String },
    #[error("canvas response had an unexpected shape for {url}")]
    UnexpectedShape { url: String },
}

impl CanvasError {
    /// `true` for errors that spec §4.C says should abort the *whole*
    /// user's sync (i.e. everything except a per-course `AccessDenied`).
    pub fn is_access_denied(&self) -> bool {
        matches!(self, CanvasError::AccessDenied { .. })
    }
}

/// Strip a trailing slash and an optional trailing `/api/v1` suffix.
pub fn normalize_canvas_base_url(base_url: &str) -> String {
    let mut normalized = base_url.trim().trim_end_matches('/').to_string();
    if normalized.to_lowercase().ends_with("/api/v1") {
        let cut = normalized.len() - "/api/v1".len();
        normalized.truncate(cut);
    }
    normalized
}

fn to_rfc3339_utc(value: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

fn course_color(course_id: &str) -> &'static str {
    let checksum: u32 = course_id.bytes().map(|b| b as u32).sum();
    COURSE_COLOR_PALETTE[(checksum as usize) % COURSE_COLOR_PALETTE.len()]
}

/// Contract-shaped course row, matching `gurt_domain::Course`'s wire fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRow {
    pub id: String,
    pub name: String,
    pub term: String,
    pub color: String,
}

/// Contract-shaped canvas item row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasItemRow {
    pub id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    pub title: String,
    #[serde(rename = "itemType")]
    pub item_type: String,
    #[serde(rename = "dueAt")]
    pub due_at: String,
    #[serde(rename = "pointsPossible")]
    pub points_possible: f64,
}

/// Contract-shaped canvas material row (pre-mirroring; no `s3Key` yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasFileRow {
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
    #[serde(rename = "downloadUrl")]
    pub download_url: String,
}

/// Canvas LMS REST client.
#[derive(Debug, Clone)]
pub struct CanvasClient {
    client: Client,
    base_url: String,
    token: String,
}

impl CanvasClient {
    pub fn new(base_url: &str, token: &str, user_agent: &str) -> Result<Self, CanvasError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|source| CanvasError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: normalize_canvas_base_url(base_url),
            token: token.to_string(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn get_json(&self, url: &str) -> Result<(Value, reqwest::header::HeaderMap), CanvasError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|source| CanvasError::Transport {
                url: url.to_string(),
                source,
            })?;

        match resp.status() {
            StatusCode::FORBIDDEN => {
                return Err(CanvasError::AccessDenied {
                    url: url.to_string(),
                });
            }
            status if status.is_client_error() || status.is_server_error() => {
                return Err(CanvasError::Api {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            _ => {}
        }

        let headers = resp.headers().clone();
        let payload: Value = resp.json().await.map_err(|_| CanvasError::InvalidJson {
            url: url.to_string(),
        })?;
        Ok((payload, headers))
    }

    async fn get_paginated_json(&self, url: &str) -> Result<Vec<Value>, CanvasError> {
        let mut rows = Vec::new();
        let mut next_url = Some(url.to_string());
        while let Some(url) = next_url.take() {
            let (payload, headers) = self.get_json(&url).await?;
            let Value::Array(items) = payload else {
                return Err(CanvasError::UnexpectedShape { url });
            };
            rows.extend(items.into_iter().filter(|v| v.is_object()));
            next_url = pagination::next_link(&headers);
        }
        Ok(rows)
    }

    /// Fetch active courses, mapped to the `Course` contract shape.
    pub async fn fetch_active_courses(&self) -> Result<Vec<CourseRow>, CanvasError> {
        let url = self.api_url("/courses?enrollment_state=active&per_page=100");
        let rows = self.get_paginated_json(&url).await?;

        let mut courses: Vec<CourseRow> = Vec::new();
        for row in rows {
            let Some(id) = row.get("id") else { continue };
            let Some(name) = row.get("name").and_then(Value::as_str) else {
                continue;
            };
            if name.trim().is_empty() {
                continue;
            }

            let term = row
                .get("term")
                .and_then(Value::as_object)
                .and_then(|t| t.get("name"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or("Canvas")
                .to_string();

            let course_id = json_id_to_string(id);
            courses.push(CourseRow {
                color: course_color(&course_id).to_string(),
                id: course_id,
                name: name.trim().to_string(),
                term,
            });
        }

        courses.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(courses)
    }

    /// Fetch the id of the authenticated Canvas caller.
    pub async fn fetch_current_user_id(&self) -> Result<String, CanvasError> {
        let url = self.api_url("/users/self/profile");
        let (payload, _) = self.get_json(&url).await?;
        let id = payload
            .get("id")
            .ok_or_else(|| CanvasError::UnexpectedShape { url: url.clone() })?;
        Ok(json_id_to_string(id))
    }

    /// Fetch published assignments with due dates for a course.
    pub async fn fetch_course_assignments(
        &self,
        course_id: &str,
    ) -> Result<Vec<CanvasItemRow>, CanvasError> {
        let url = self.api_url(&format!(
            "/courses/{course_id}/assignments?per_page=100&order_by=due_at"
        ));
        let rows = self.get_paginated_json(&url).await?;

        let mut items = Vec::new();
        for row in rows {
            if row.get("published").and_then(Value::as_bool) != Some(true) {
                continue;
            }
            let Some(due_at) = row.get("due_at").and_then(Value::as_str) else {
                continue;
            };
            if due_at.trim().is_empty() {
                continue;
            }
            let Some(assignment_id) = row.get("id") else {
                continue;
            };
            let Some(title) = row.get("name").and_then(Value::as_str) else {
                continue;
            };
            if title.trim().is_empty() {
                continue;
            }
            let Some(due_at) = to_rfc3339_utc(due_at) else {
                continue;
            };

            let points_possible = row
                .get("points_possible")
                .and_then(Value::as_f64)
                .filter(|p| *p >= 0.0)
                .unwrap_or(0.0);

            items.push(CanvasItemRow {
                id: json_id_to_string(assignment_id),
                course_id: course_id.to_string(),
                title: title.trim().to_string(),
                item_type: assignment_item_type(&row).to_string(),
                due_at,
                points_possible,
            });
        }

        items.sort_by(|a, b| a.due_at.cmp(&b.due_at));
        Ok(items)
    }

    /// Fetch visible, published course files.
    pub async fn fetch_course_files(
        &self,
        course_id: &str,
    ) -> Result<Vec<CanvasFileRow>, CanvasError> {
        let url = self.api_url(&format!(
            "/courses/{course_id}/files?per_page=100&sort=updated_at&order=desc"
        ));
        let rows = self.get_paginated_json(&url).await?;

        let mut items = Vec::new();
        for row in rows {
            if row.get("published").and_then(Value::as_bool) == Some(false) {
                continue;
            }
            if row.get("hidden").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            if row.get("locked_for_user").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            let Some(file_id) = row.get("id") else { continue };

            let display_name = row
                .get("display_name")
                .and_then(Value::as_str)
                .filter(|n| !n.trim().is_empty())
                .or_else(|| row.get("filename").and_then(Value::as_str))
                .map(str::trim);
            let Some(display_name) = display_name.filter(|n| !n.is_empty()) else {
                continue;
            };

            let Some(updated_at) = row.get("updated_at").and_then(Value::as_str) else {
                continue;
            };
            let Some(updated_at) = to_rfc3339_utc(updated_at) else {
                continue;
            };

            let download_url = row
                .get("url")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|u| !u.is_empty());
            let Some(download_url) = download_url else {
                continue;
            };

            let size_bytes = row.get("size").and_then(Value::as_i64).filter(|s| *s >= 0).unwrap_or(0);

            items.push(CanvasFileRow {
                canvas_file_id: json_id_to_string(file_id),
                course_id: course_id.to_string(),
                display_name: display_name.to_string(),
                content_type: normalize_content_type(&row),
                size_bytes,
                updated_at,
                download_url: download_url.to_string(),
            });
        }

        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(items)
    }

    /// Download a file's bytes and its content type.
    pub async fn fetch_file_bytes(&self, url: &str) -> Result<(Vec<u8>, String), CanvasError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "*/*")
            .send()
            .await
            .map_err(|source| CanvasError::Transport {
                url: url.to_string(),
                source,
            })?;

        if resp.status().is_client_error() || resp.status().is_server_error() {
            let status = resp.status().as_u16();
            return Err(if status == 403 {
                CanvasError::AccessDenied {
                    url: url.to_string(),
                }
            } else {
                CanvasError::Api {
                    status,
                    url: url.to_string(),
                }
            });
        }

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| CanvasError::Transport {
                url: url.to_string(),
                source,
            })?;
        Ok((bytes.to_vec(), content_type))
    }
}

fn json_id_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string().trim_matches('"').to_string(),
    }
}

fn assignment_item_type(row: &Value) -> &'static str {
    let title = row.get("name").and_then(Value::as_str).unwrap_or("");
    if row.get("quiz_id").is_some_and(|v| !v.is_null()) || QUIZ_PATTERN.is_match(title) {
        "quiz"
    } else if EXAM_PATTERN.is_match(title) {
        "exam"
    } else {
        "assignment"
    }
}

fn normalize_content_type(row: &Value) -> String {
    let content_type = row
        .get("content-type")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .or_else(|| row.get("content_type").and_then(Value::as_str))
        .filter(|c| !c.trim().is_empty());
    match content_type {
        Some(ct) => ct.trim().to_lowercase(),
        None => "application/octet-stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slash_and_api_v1_suffix() {
        assert_eq!(
            normalize_canvas_base_url("https://canvas.example/api/v1/"),
            "https://canvas.example"
        );
        assert_eq!(
            normalize_canvas_base_url("https://canvas.example/"),
            "https://canvas.example"
        );
        assert_eq!(
            normalize_canvas_base_url("https://canvas.example"),
            "https://canvas.example"
        );
    }

    #[test]
    fn classifies_exam_by_title_pattern() {
        let row = serde_json::json!({"name": "Midterm Review"});
        assert_eq!(assignment_item_type(&row), "exam");
    }

    #[test]
    fn classifies_quiz_by_quiz_id_presence() {
        let row = serde_json::json!({"name": "Weekly Check", "quiz_id": 42});
        assert_eq!(assignment_item_type(&row), "quiz");
    }

    #[test]
    fn classifies_quiz_by_title_pattern() {
        let row = serde_json::json!({"name": "Pop Quiz 3"});
        assert_eq!(assignment_item_type(&row), "quiz");
    }

    #[test]
    fn defaults_to_assignment() {
        let row = serde_json::json!({"name": "Homework 1"});
        assert_eq!(assignment_item_type(&row), "assignment");
    }

    #[test]
    fn content_type_aliases_underscore_and_hyphen_keys() {
        let hyphen = serde_json::json!({"content-type": "application/pdf"});
        assert_eq!(normalize_content_type(&hyphen), "application/pdf");
        let underscore = serde_json::json!({"content_type": "text/plain"});
        assert_eq!(normalize_content_type(&underscore), "text/plain");
        let neither = serde_json::json!({});
        assert_eq!(normalize_content_type(&neither), "application/octet-stream");
    }

    #[test]
    fn course_color_is_a_pure_function_of_course_id() {
        assert_eq!(course_color("170880"), course_color("170880"));
    }
}
