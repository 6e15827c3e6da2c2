//! Read-time aggregation of click events into the per-link summary:
//! daily buckets over a 30-day window, top referrers, device mix.
//!
//! The grouping passes are pure functions over rows the store already
//! filtered to one link; [`summarize`] wires them to the four reads.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::clock::{days_ago, start_of_day, Clock};
use crate::db::{self, Pool};
use crate::domain::{DayCount, DeviceCount, LinkAnalytics, LinkId, ReferrerCount};
use crate::error::Result;

/// Clicks with no referrer header are filed under this label.
const DIRECT_REFERRER: &str = "direct";

const TOP_REFERRERS_LIMIT: usize = 5;

/// Bucket click timestamps by UTC calendar day, ascending by day key.
/// Days with no clicks are not synthesized.
pub fn group_by_day(times: &[DateTime<Utc>]) -> Vec<DayCount> {
    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    for time in times {
        let key = start_of_day(*time).format("%Y-%m-%d").to_string();
        *buckets.entry(key).or_insert(0) += 1;
    }

    buckets
        .into_iter()
        .map(|(day, count)| DayCount { day, count })
        .collect()
}

/// Count clicks per referrer, absent/empty mapped to `"direct"`,
/// descending by count, top 5. The grouping map iterates in key order
/// and the sort is stable, so ties land in ascending referrer order.
pub fn tally_referrers(referrers: &[Option<String>]) -> Vec<ReferrerCount> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for referrer in referrers {
        let key = match referrer.as_deref() {
            Some(r) if !r.is_empty() => r.to_string(),
            _ => DIRECT_REFERRER.to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut tallied: Vec<ReferrerCount> = counts
        .into_iter()
        .map(|(referrer, count)| ReferrerCount { referrer, count })
        .collect();
    tallied.sort_by(|a, b| b.count.cmp(&a.count));
    tallied.truncate(TOP_REFERRERS_LIMIT);
    tallied
}

/// Count clicks per device category, absent/empty mapped to
/// `"unknown"`, ascending by category. No truncation.
pub fn tally_devices(device_types: &[Option<String>]) -> Vec<DeviceCount> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for device in device_types {
        let key = match device.as_deref() {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => "unknown".to_string(),
        };
        *counts.entry(key).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(device_type, count)| DeviceCount { device_type, count })
        .collect()
}

/// Run the four reads for one link and assemble the summary. Strict on
/// read failures: any failing query aborts the whole summary.
pub async fn summarize(pool: &Pool, clock: &dyn Clock, link_id: LinkId) -> Result<LinkAnalytics> {
    let clicks_last_7_days = db::count_clicks_since(pool, link_id, days_ago(clock, 7)).await?;

    let times = db::click_times_since(pool, link_id, days_ago(clock, 30)).await?;
    let clicks_by_day = group_by_day(&times);

    let referrers = db::click_referrers(pool, link_id).await?;
    let top_referrers = tally_referrers(&referrers);

    let device_types = db::click_device_types(pool, link_id).await?;
    let device_breakdown = tally_devices(&device_types);

    Ok(LinkAnalytics {
        clicks_last_7_days,
        clicks_by_day,
        top_referrers,
        device_breakdown,
    })
}
