//! Criterion benchmarks for linklet analytics queries
//!
//! Run with: cargo bench
//!
//! Each benchmark seeds its own throwaway SQLite database, so no prior
//! setup is needed. For larger datasets use the loadtest binary.

use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::hint::black_box;
use std::str::FromStr;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use uuid::Uuid;

use linklet::analytics;
use linklet::clock::{days_ago, SystemClock};
use linklet::db;
use linklet::domain::{LinkId, Slug};

const CLICKS: usize = 10_000;
const DAYS_BACK: i64 = 40;

const REFERRERS: &[&str] = &[
    "",
    "",
    "https://google.com/search?q=example",
    "https://news.ycombinator.com/item?id=12345",
    "https://reddit.com/r/selfhosted",
    "https://twitter.com/someone/status/123",
    "https://linkedin.com/feed",
];

const DEVICE_TYPES: &[&str] = &[
    "desktop", "desktop", "desktop", "mobile", "mobile", "tablet", "unknown",
];

async fn seed(dir: &TempDir) -> (Pool<Sqlite>, LinkId, Slug) {
    let db_url = format!("sqlite:{}?mode=rwc", dir.path().join("bench.db").display());
    let options = SqliteConnectOptions::from_str(&db_url)
        .unwrap()
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to create pool");

    sqlx::raw_sql(include_str!("../migrations/sqlite/001_initial.sql"))
        .execute(&pool)
        .await
        .expect("Failed to run migrations");

    let id = Uuid::new_v4();
    let slug = Slug::generate();
    sqlx::query(
        "INSERT INTO links (id, slug, target_url, created_at, expires_at, clicks_count) \
         VALUES (?, ?, 'https://example.com/', ?, NULL, 0)",
    )
    .bind(id.to_string())
    .bind(slug.as_str())
    .bind((Utc::now() - Duration::days(DAYS_BACK)).to_rfc3339())
    .execute(&pool)
    .await
    .expect("Failed to create link");

    let mut rng = rand::rng();
    let max_ms = DAYS_BACK * 24 * 60 * 60 * 1000;

    for chunk_start in (0..CLICKS).step_by(1000) {
        let chunk = (CLICKS - chunk_start).min(1000);
        let mut query = String::from(
            "INSERT INTO clicks (link_id, created_at, referrer, user_agent, device_type) VALUES ",
        );
        for i in 0..chunk {
            if i > 0 {
                query.push_str(", ");
            }
            query.push_str("(?, ?, ?, NULL, ?)");
        }

        let mut q = sqlx::query(&query);
        for _ in 0..chunk {
            let created_at = Utc::now() - Duration::milliseconds(rng.random_range(0..max_ms));
            let referrer = REFERRERS[rng.random_range(0..REFERRERS.len())];
            let referrer = if referrer.is_empty() {
                None
            } else {
                Some(referrer)
            };
            q = q
                .bind(id.to_string())
                .bind(created_at.to_rfc3339())
                .bind(referrer)
                .bind(DEVICE_TYPES[rng.random_range(0..DEVICE_TYPES.len())]);
        }
        q.execute(&pool).await.expect("Failed to insert clicks");
    }

    (pool, LinkId::from_uuid(id), slug)
}

fn bench_slug_lookup(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let (pool, _, slug) = rt.block_on(seed(&dir));

    c.bench_function("slug_lookup", |b| {
        b.to_async(&rt).iter(|| async {
            let link = db::get_link_by_slug(&pool, &slug).await.unwrap();
            black_box(link)
        });
    });
}

fn bench_click_count(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let (pool, link_id, _) = rt.block_on(seed(&dir));
    let clock = SystemClock;

    let mut group = c.benchmark_group("click_count");

    group.bench_function(BenchmarkId::new("windowed", "7_days"), |b| {
        b.to_async(&rt).iter(|| async {
            let count = db::count_clicks_since(&pool, link_id, days_ago(&clock, 7))
                .await
                .unwrap();
            black_box(count)
        });
    });

    group.bench_function(BenchmarkId::new("windowed", "30_days"), |b| {
        b.to_async(&rt).iter(|| async {
            let count = db::count_clicks_since(&pool, link_id, days_ago(&clock, 30))
                .await
                .unwrap();
            black_box(count)
        });
    });

    group.bench_function(BenchmarkId::new("all_time", "full"), |b| {
        b.to_async(&rt).iter(|| async {
            let count = db::count_clicks(&pool, link_id).await.unwrap();
            black_box(count)
        });
    });

    group.finish();
}

fn bench_daily_buckets(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let (pool, link_id, _) = rt.block_on(seed(&dir));
    let clock = SystemClock;

    c.bench_function("daily_buckets_30d", |b| {
        b.to_async(&rt).iter(|| async {
            let times = db::click_times_since(&pool, link_id, days_ago(&clock, 30))
                .await
                .unwrap();
            black_box(analytics::group_by_day(&times))
        });
    });
}

fn bench_referrer_tally(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let (pool, link_id, _) = rt.block_on(seed(&dir));

    c.bench_function("referrer_tally", |b| {
        b.to_async(&rt).iter(|| async {
            let referrers = db::click_referrers(&pool, link_id).await.unwrap();
            black_box(analytics::tally_referrers(&referrers))
        });
    });
}

fn bench_device_breakdown(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let (pool, link_id, _) = rt.block_on(seed(&dir));

    c.bench_function("device_breakdown", |b| {
        b.to_async(&rt).iter(|| async {
            let devices = db::click_device_types(&pool, link_id).await.unwrap();
            black_box(analytics::tally_devices(&devices))
        });
    });
}

fn bench_full_summary(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let (pool, link_id, _) = rt.block_on(seed(&dir));
    let clock = SystemClock;

    // Everything the analytics endpoint runs for one page load.
    c.bench_function("full_summary", |b| {
        b.to_async(&rt).iter(|| async {
            let summary = analytics::summarize(&pool, &clock, link_id).await.unwrap();
            black_box(summary)
        });
    });
}

criterion_group!(
    benches,
    bench_slug_lookup,
    bench_click_count,
    bench_daily_buckets,
    bench_referrer_tally,
    bench_device_breakdown,
    bench_full_summary,
);

criterion_main!(benches);
