//! RFC5988 `Link` header pagination.

use reqwest::header::HeaderMap;

/// The `rel="next"` target extracted from a `Link` response header, if any.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let header = headers.get("link")?.to_str().ok()?;
    for part in header.split(',') {
        let mut segments = part.split(';');
        let url = segments.next().map(|s| {
            s.trim()
                .trim_start_matches('<')
                .trim_end_matches('>')
                .to_string()
        })?;
        let is_next = segments.any(|seg| {
            let seg = seg.trim();
            seg.strip_prefix("rel=")
                .map(|rel| rel.trim_matches('"') == "next")
                .unwrap_or(false)
        });
        if is_next {
            return Some(url);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_link(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("link", value.parse().unwrap());
        headers
    }

    #[test]
    fn extracts_next_url_from_multi_rel_header() {
        let headers = headers_with_link(
            r#"<https://canvas.example/api/v1/courses?page=1>; rel="current", <https://canvas.example/api/v1/courses?page=2>; rel="next""#,
        );
        assert_eq!(
            next_link(&headers),
            Some("https://canvas.example/api/v1/courses?page=2".to_string())
        );
    }

    #[test]
    fn returns_none_without_next_rel() {
        let headers =
            headers_with_link(r#"<https://canvas.example/api/v1/courses?page=1>; rel="current""#);
        assert_eq!(next_link(&headers), None);
    }

    #[test]
    fn returns_none_without_link_header() {
        assert_eq!(next_link(&HeaderMap::new()), None);
    }
}
