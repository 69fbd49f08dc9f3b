//! Forwarding-header removal.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

/// Whether a header survives the filter.
///
/// Names starting with `x-` or `host` are dropped, everything else is kept.
/// Header names are lowercase in [`HeaderMap`], so the prefix match is exact.
pub fn keep_header(name: &str) -> bool {
    !(name.starts_with("x-") || name.starts_with("host"))
}

/// Copy of `headers` without the `x-*` and `host*` entries.
///
/// Repeated headers keep all their values.
pub fn filter_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| keep_header(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Strips proxy and host headers before the request reaches application code.
pub async fn layer(mut req: Request, next: Next) -> Response {
    let filtered = filter_headers(req.headers());
    *req.headers_mut() = filtered;
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_filter_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        headers.insert("host", HeaderValue::from_static("a.com"));
        headers.insert("content-type", HeaderValue::from_static("json"));

        let filtered = filter_headers(&headers);

        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.get("content-type").unwrap(), "json");
    }

    #[test]
    fn test_prefix_only() {
        assert!(!keep_header("x-real-ip"));
        assert!(!keep_header("hostname"));
        assert!(keep_header("accept"));
        assert!(keep_header("proxy-x-thing"));
        assert!(keep_header("ghost"));
    }

    #[test]
    fn test_repeated_values_survive() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));

        let filtered = filter_headers(&headers);
        assert_eq!(filtered.get_all("accept").iter().count(), 2);
    }
}
