use crate::{error::LinkError, models::ClickContext, AppState};
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, sync::Arc};

/// GET /:code
///
/// Resolves the code, records the click with the request's metadata and
/// answers with a 302 to the original URL.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, LinkError> {
    let ctx = ClickContext {
        user_agent: header_str(&headers, "user-agent"),
        referer: header_str(&headers, "referer"),
        ip: extract_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr)),
        location: None,
    };

    let original_url = state.service.resolve(&code, ctx)?;

    Ok((StatusCode::FOUND, [(header::LOCATION, original_url)]).into_response())
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Determine the real client IP, preferring common proxy headers.
fn extract_ip(headers: &HeaderMap, addr: Option<SocketAddr>) -> Option<String> {
    // X-Forwarded-For can be a comma-separated list; take the first entry.
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(ip) = xff.split(',').next().map(str::trim) {
            if !ip.is_empty() {
                return Some(ip.to_owned());
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return Some(real_ip.to_owned());
        }
    }

    addr.map(|a| a.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app, service::CreateLink, test_state};
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    #[test]
    fn ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.1:5555".parse().unwrap();
        assert_eq!(extract_ip(&headers, Some(peer)).as_deref(), Some("10.0.0.1"));
        assert_eq!(extract_ip(&headers, None), None);

        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(extract_ip(&headers, Some(peer)).as_deref(), Some("198.51.100.2"));

        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(extract_ip(&headers, Some(peer)).as_deref(), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn redirects_and_records_click() {
        let state = test_state();
        state
            .service
            .create(CreateLink {
                url: "https://example.com/a".into(),
                shortcode: Some("abc123".into()),
                ..Default::default()
            })
            .unwrap();

        let resp = app(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/abc123")
                    .header("user-agent", "curl/8.0")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "https://example.com/a");

        let stats = state.service.stats("abc123").unwrap();
        assert_eq!(stats.click_count, 1);
        assert_eq!(stats.clicks[0].user_agent, "curl/8.0");
        assert_eq!(stats.clicks[0].referer, "Direct");
        assert_eq!(stats.clicks[0].ip, "203.0.113.9");
        assert_eq!(stats.clicks[0].location, "Unknown");
    }

    #[tokio::test]
    async fn unknown_code_is_404() {
        let resp = app(test_state())
            .oneshot(Request::builder().uri("/zzz999").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
