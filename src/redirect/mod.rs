use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::db;
use crate::domain::{CreateClick, Slug};
use crate::error::Error;
use crate::state::AppState;
use crate::ua::classify_device;

/// Referrer URL from headers, trimmed; absent or empty is None.
pub fn get_referrer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("referer")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Raw user-agent value from headers, trimmed; absent or empty is None.
pub fn get_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// GET /{slug}
///
/// Resolves the slug, rejects expired links, records the click, and
/// answers 302 so future expirations stay observable. The click write
/// is best-effort: a failure is logged and never delays or blocks the
/// redirect, which is the primary contract. At most one click row per
/// invocation, never retried.
pub async fn follow(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    let slug = Slug::from(slug);

    let link = match db::get_link_by_slug(&state.pool, &slug).await {
        Ok(link) => link,
        Err(Error::LinkNotFound) => return Error::LinkNotFound.into_response(),
        Err(e) => {
            error!("Error resolving slug {}: {}", slug, e);
            return e.into_response();
        }
    };

    if link.is_expired(state.clock.now()) {
        return Error::LinkExpired.into_response();
    }

    let user_agent = get_user_agent(&headers);
    let click = CreateClick {
        link_id: link.id,
        referrer: get_referrer(&headers),
        device_type: classify_device(user_agent.as_deref()),
        user_agent,
    };

    if let Err(e) = db::create_click(&state.pool, click, state.clock.now()).await {
        error!("Failed to record click for slug {}: {}", slug, e);
    }

    (
        StatusCode::FOUND,
        [(header::LOCATION, link.target_url.as_str())],
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_referrer_present() {
        let mut headers = HeaderMap::new();
        headers.insert("referer", "https://news.ycombinator.com/".parse().unwrap());
        assert_eq!(
            get_referrer(&headers),
            Some("https://news.ycombinator.com/".to_string())
        );
    }

    #[test]
    fn test_get_referrer_absent() {
        assert_eq!(get_referrer(&HeaderMap::new()), None);
    }

    #[test]
    fn test_get_referrer_empty_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert("referer", "".parse().unwrap());
        assert_eq!(get_referrer(&headers), None);
    }

    #[test]
    fn test_get_referrer_trims_whitespace() {
        let mut headers = HeaderMap::new();
        headers.insert("referer", "  https://a.com  ".parse().unwrap());
        assert_eq!(get_referrer(&headers), Some("https://a.com".to_string()));
    }

    #[test]
    fn test_get_user_agent_present() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", "Mozilla/5.0".parse().unwrap());
        assert_eq!(get_user_agent(&headers), Some("Mozilla/5.0".to_string()));
    }

    #[test]
    fn test_get_user_agent_absent() {
        assert_eq!(get_user_agent(&HeaderMap::new()), None);
    }

    #[test]
    fn test_get_user_agent_empty_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", "".parse().unwrap());
        assert_eq!(get_user_agent(&headers), None);
    }
}
