use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use url::Url;

use crate::analytics;
use crate::db;
use crate::domain::{CreateLink, Link, LinkAnalytics, Slug};
use crate::error::{Error, ErrorBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUrlRequest {
    pub target_url: Option<String>,
    pub custom_slug: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UrlBody {
    pub url: Link,
}

#[derive(Debug, Serialize)]
pub struct UrlListBody {
    pub urls: Vec<Link>,
}

/// Link fields echoed alongside an analytics summary. `totalClicks`
/// reads the denormalized counter, not a scan.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsUrl {
    pub slug: Slug,
    pub target_url: String,
    pub total_clicks: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Link> for AnalyticsUrl {
    fn from(link: Link) -> Self {
        Self {
            slug: link.slug,
            target_url: link.target_url,
            total_clicks: link.clicks_count,
            created_at: link.created_at,
            expires_at: link.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsBody {
    pub url: AnalyticsUrl,
    pub analytics: LinkAnalytics,
}

/// Parse an expiration input: RFC 3339, datetime-local
/// (YYYY-MM-DDTHH:MM), or a bare date. A bare date means the end of
/// that day UTC, so a link expiring "today" stays live through today.
fn parse_expiration(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(23, 59, 59).unwrap().and_utc());
    }
    None
}

/// A target is valid when it parses as an absolute URL with both a
/// scheme and a host component.
fn is_valid_target(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => url.has_host(),
        Err(_) => false,
    }
}

fn storage_error(msg: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// POST /api/urls
pub async fn create_url(
    State(state): State<AppState>,
    Json(payload): Json<CreateUrlRequest>,
) -> Response {
    let now = state.clock.now();

    let expires_at = match payload.expires_at.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => match parse_expiration(s) {
            Some(at) => {
                // Date-only comparison: an instant earlier today is fine.
                if at.date_naive() < now.date_naive() {
                    return Error::ExpirationInPast.into_response();
                }
                Some(at)
            }
            None => return Error::InvalidExpirationDate.into_response(),
        },
        _ => None,
    };

    let target_url = payload.target_url.as_deref().unwrap_or("").trim();
    if !is_valid_target(target_url) {
        return Error::InvalidTargetUrl.into_response();
    }

    let custom_slug = payload
        .custom_slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let slug = match custom_slug {
        Some(s) => {
            let slug = Slug::from(s);
            match db::slug_exists(&state.pool, &slug).await {
                Ok(true) => return Error::SlugTaken.into_response(),
                Ok(false) => slug,
                Err(e) => {
                    error!("Error checking slug {}: {}", slug, e);
                    return storage_error("Error checking slug availability");
                }
            }
        }
        None => Slug::generate(),
    };

    let input = CreateLink {
        slug,
        target_url: target_url.to_string(),
        expires_at,
    };

    let link = match db::create_link(&state.pool, input.clone(), now).await {
        Ok(link) => link,
        Err(e) if e.is_unique_violation() => {
            // The UNIQUE constraint is the authoritative conflict
            // signal; the pre-check above only covers the common case.
            if custom_slug.is_some() {
                return Error::SlugTaken.into_response();
            }
            // Generated slug lost the draw. Regenerate once.
            let retry = CreateLink {
                slug: Slug::generate(),
                ..input
            };
            match db::create_link(&state.pool, retry, now).await {
                Ok(link) => link,
                Err(e) => {
                    error!("Error creating link after slug retry: {}", e);
                    return storage_error("Failed to create short URL");
                }
            }
        }
        Err(e) => {
            error!("Error creating link: {}", e);
            return storage_error("Failed to create short URL");
        }
    };

    (StatusCode::CREATED, Json(UrlBody { url: link })).into_response()
}

/// GET /api/urls
pub async fn list_urls(State(state): State<AppState>) -> Response {
    match db::list_links(&state.pool).await {
        Ok(urls) => Json(UrlListBody { urls }).into_response(),
        Err(e) => {
            error!("Error listing links: {}", e);
            storage_error("Failed to load URLs")
        }
    }
}

/// GET /api/urls/{slug}/analytics
pub async fn url_analytics(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let slug = Slug::from(slug);

    let link = match db::get_link_by_slug(&state.pool, &slug).await {
        Ok(link) => link,
        Err(Error::LinkNotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: "URL not found".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Error resolving slug {}: {}", slug, e);
            return storage_error("Failed to load analytics");
        }
    };

    match analytics::summarize(&state.pool, state.clock.as_ref(), link.id).await {
        Ok(summary) => Json(AnalyticsBody {
            url: AnalyticsUrl::from(link),
            analytics: summary,
        })
        .into_response(),
        Err(e) => {
            error!("Error aggregating analytics for {}: {}", slug, e);
            storage_error("Failed to load analytics")
        }
    }
}
