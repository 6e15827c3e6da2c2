use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{ClickId, DeviceType, LinkId, Slug};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: LinkId,
    pub slug: Slug,
    pub target_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub clicks_count: i64,
}

impl Link {
    /// A link is expired only when it carries an expiry strictly
    /// before `now`. A link without one never expires.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Click {
    pub id: ClickId,
    pub link_id: LinkId,
    pub created_at: DateTime<Utc>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
}

#[derive(Debug, Clone)]
pub struct CreateLink {
    pub slug: Slug,
    pub target_url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateClick {
    pub link_id: LinkId,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferrerCount {
    pub referrer: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCount {
    pub device_type: String,
    pub count: i64,
}

/// Aggregated click summary for one link, as served by the analytics
/// endpoint. The all-time total lives on the link itself.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAnalytics {
    pub clicks_last_7_days: i64,
    pub clicks_by_day: Vec<DayCount>,
    pub top_referrers: Vec<ReferrerCount>,
    pub device_breakdown: Vec<DeviceCount>,
}
