//! Load Test Data Seeder and Benchmark for linklet
//!
//! Creates short links with a configurable number of clicks per link.
//! Default: 50 links × 20k clicks/link = 1M total clicks. SQLite only.
//!
//! # Usage
//!
//! ```bash
//! # Seed a persistent database (default: loadtest.db)
//! cargo run --release --bin loadtest -- seed
//!
//! # Seed with custom settings
//! cargo run --release --bin loadtest -- seed --db ./my-test.db --clicks 50000 --links 20
//!
//! # Run benchmarks on existing database
//! cargo run --release --bin loadtest -- bench --db ./loadtest.db
//!
//! # Seed and immediately benchmark
//! cargo run --release --bin loadtest -- seed --bench
//!
//! # Then start the server with this database:
//! LINKLET__DATABASE_PATH=./loadtest.db cargo run --release
//! ```

use chrono::{DateTime, Duration, Utc};
use rand::prelude::*;
use rand_distr::Exp;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;
use uuid::Uuid;

use linklet::analytics;
use linklet::clock::{days_ago, SystemClock};
use linklet::config::Settings;
use linklet::db;
use linklet::domain::{LinkId, Slug};
use linklet::ua::classify_device;

const TARGET_URLS: &[&str] = &[
    "https://example.com/",
    "https://example.com/pricing",
    "https://example.com/blog/launch-post",
    "https://example.com/blog/release-notes",
    "https://example.com/docs/quickstart",
    "https://example.com/docs/api",
    "https://example.com/signup",
    "https://example.com/demo",
    "https://shop.example.com/products/pro",
    "https://shop.example.com/products/enterprise",
    "https://events.example.com/webinar",
    "https://events.example.com/conference-2025",
];

const REFERRERS: &[&str] = &[
    "",
    "",
    "",
    "",
    "https://google.com/search?q=example",
    "https://google.com/search?q=short+links",
    "https://duckduckgo.com/?q=linklet",
    "https://bing.com/search?q=example",
    "https://twitter.com/someone/status/123",
    "https://reddit.com/r/selfhosted",
    "https://reddit.com/r/webdev",
    "https://news.ycombinator.com/item?id=12345",
    "https://linkedin.com/feed",
    "https://facebook.com",
    "https://dev.to/article/url-shorteners",
    "https://medium.com/@author/post",
];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 17_2 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; SM-S918B) AppleWebKit/537.36 Mobile Safari/537.36",
];

/// Generate a random datetime within the last N days, weighted toward recent
fn random_recent_datetime(rng: &mut impl Rng, days_back: u32) -> DateTime<Utc> {
    let now = Utc::now();
    let max_ms = (days_back as i64) * 24 * 60 * 60 * 1000;
    // Exponential distribution favoring recent dates
    let exp = Exp::new(3.0 / max_ms as f64).unwrap();
    let offset_ms = (exp.sample(rng) as i64).min(max_ms);
    now - Duration::milliseconds(offset_ms)
}

struct LinkData {
    id: Uuid,
    slug: String,
}

async fn create_pool(db_url: &str) -> Pool<Sqlite> {
    let options = SqliteConnectOptions::from_str(db_url)
        .unwrap()
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

    SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await
        .expect("Failed to create pool")
}

async fn run_migrations(pool: &Pool<Sqlite>) {
    sqlx::raw_sql(include_str!("../../migrations/sqlite/001_initial.sql"))
        .execute(pool)
        .await
        .expect("Failed to run migrations");

    // Optimize for bulk inserts
    sqlx::query("PRAGMA cache_size = -64000") // 64MB cache
        .execute(pool)
        .await
        .expect("Failed to set cache_size");
    sqlx::query("PRAGMA temp_store = MEMORY")
        .execute(pool)
        .await
        .expect("Failed to set temp_store");
}

async fn seed_database(
    pool: &Pool<Sqlite>,
    num_links: usize,
    clicks_per_link: u64,
    days_back: u32,
) -> Vec<LinkData> {
    let mut rng = rand::rng();

    println!("Creating {} links...", num_links);
    let start = Instant::now();

    let mut links: Vec<LinkData> = Vec::with_capacity(num_links);

    for i in 0..num_links {
        let id = Uuid::new_v4();
        let slug = Slug::generate().to_string();
        let target_url = TARGET_URLS[i % TARGET_URLS.len()];
        let created_at = Utc::now() - Duration::days(days_back as i64);

        sqlx::query(
            "INSERT INTO links (id, slug, target_url, created_at, expires_at, clicks_count) \
             VALUES (?, ?, ?, ?, NULL, 0)",
        )
        .bind(id.to_string())
        .bind(&slug)
        .bind(target_url)
        .bind(created_at.to_rfc3339())
        .execute(pool)
        .await
        .expect("Failed to create link");

        links.push(LinkData { id, slug });
    }

    println!("  Created {} links in {:?}", num_links, start.elapsed());

    // Print plan
    let total_clicks = clicks_per_link * num_links as u64;
    println!("\nData plan:");
    println!(
        "  {} clicks per link x {} links = {} total clicks",
        clicks_per_link, num_links, total_clicks
    );
    println!("  Time range: last {} days", days_back);
    println!();

    // Generate and insert clicks. The clicks_count trigger keeps the
    // per-link totals in step with every batch.
    println!("Generating {} clicks...", total_clicks);
    let click_start = Instant::now();
    let batch_size = 1000usize;
    let mut done = 0u64;

    // (link_id, created_at, referrer, user_agent)
    let mut batch: Vec<(Uuid, DateTime<Utc>, &str, &str)> = Vec::with_capacity(batch_size);

    for link in &links {
        for _ in 0..clicks_per_link {
            let created_at = random_recent_datetime(&mut rng, days_back);
            let referrer = REFERRERS[rng.random_range(0..REFERRERS.len())];
            let user_agent = USER_AGENTS[rng.random_range(0..USER_AGENTS.len())];
            batch.push((link.id, created_at, referrer, user_agent));

            if batch.len() >= batch_size {
                insert_click_batch(pool, &batch).await;
                done += batch.len() as u64;
                batch.clear();

                let elapsed = click_start.elapsed().as_secs_f64();
                let rate = done as f64 / elapsed;
                let remaining = (total_clicks - done) as f64 / rate;
                print!(
                    "\r  Progress: {}/{} ({:.1}%) | {:.0} clicks/sec | ETA: {:.0}s    ",
                    done,
                    total_clicks,
                    (done as f64 / total_clicks as f64) * 100.0,
                    rate,
                    remaining
                );
            }
        }
    }

    if !batch.is_empty() {
        insert_click_batch(pool, &batch).await;
    }

    println!(
        "\n  Inserted {} clicks in {:?}",
        total_clicks,
        click_start.elapsed()
    );

    // Summary
    let total_time = start.elapsed();
    println!("\n{}", "=".repeat(60));
    println!("Seeding complete!");
    println!("{}", "=".repeat(60));
    println!("  Total time: {:?}", total_time);
    println!("  Links: {}", num_links);
    println!("  Clicks: {}", total_clicks);
    println!(
        "  Insert rate: {:.0} clicks/sec",
        total_clicks as f64 / total_time.as_secs_f64()
    );

    links
}

async fn insert_click_batch(pool: &Pool<Sqlite>, batch: &[(Uuid, DateTime<Utc>, &str, &str)]) {
    let mut query = String::from(
        "INSERT INTO clicks (link_id, created_at, referrer, user_agent, device_type) VALUES ",
    );
    for (i, _) in batch.iter().enumerate() {
        if i > 0 {
            query.push_str(", ");
        }
        query.push_str("(?, ?, ?, ?, ?)");
    }

    let mut q = sqlx::query(&query);
    for (link_id, created_at, referrer, user_agent) in batch {
        let referrer = if referrer.is_empty() {
            None
        } else {
            Some(*referrer)
        };
        q = q
            .bind(link_id.to_string())
            .bind(created_at.to_rfc3339())
            .bind(referrer)
            .bind(*user_agent)
            .bind(classify_device(Some(user_agent)).as_str());
    }
    q.execute(pool).await.expect("Failed to insert clicks");
}

async fn run_benchmarks(pool: &Pool<Sqlite>) {
    let links: Vec<(String, String)> =
        sqlx::query_as("SELECT id, slug FROM links ORDER BY clicks_count DESC")
            .fetch_all(pool)
            .await
            .expect("Failed to fetch links");

    if links.is_empty() {
        eprintln!("No links found. Run seeding first.");
        return;
    }

    let top_link = &links[0];
    let top_id = LinkId::from_uuid(Uuid::parse_str(&top_link.0).expect("Invalid link id"));
    let top_slug = Slug::from(top_link.1.as_str());
    let clock = SystemClock;

    println!("\n{}", "=".repeat(70));
    println!("Running Benchmarks");
    println!("{}", "=".repeat(70));
    println!("Test link: {} ({})", top_link.1, top_link.0);
    println!();

    let iterations = 50;

    struct BenchResult {
        name: String,
        times: Vec<f64>,
    }

    impl BenchResult {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                times: Vec::new(),
            }
        }

        fn mean(&self) -> f64 {
            self.times.iter().sum::<f64>() / self.times.len() as f64
        }

        fn median(&self) -> f64 {
            let mut sorted = self.times.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            sorted[sorted.len() / 2]
        }

        fn p95(&self) -> f64 {
            let mut sorted = self.times.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            sorted[(sorted.len() as f64 * 0.95) as usize]
        }

        fn p99(&self) -> f64 {
            let mut sorted = self.times.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            sorted[(sorted.len() as f64 * 0.99).min(sorted.len() as f64 - 1.0) as usize]
        }

        fn max(&self) -> f64 {
            *self
                .times
                .iter()
                .max_by(|a, b| a.partial_cmp(b).unwrap())
                .unwrap()
        }
    }

    let mut results: Vec<BenchResult> = Vec::new();

    // Benchmark: slug lookup (the redirect hot path)
    println!("1/6 Slug lookup...");
    let mut bench = BenchResult::new("Slug lookup");
    for _ in 0..iterations {
        let start = Instant::now();
        db::get_link_by_slug(pool, &top_slug)
            .await
            .expect("Slug lookup failed");
        bench.times.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    results.push(bench);

    // Benchmark: 7-day click count
    println!("2/6 Click count (7 days)...");
    let mut bench = BenchResult::new("Click count (7d)");
    for _ in 0..iterations {
        let start = Instant::now();
        db::count_clicks_since(pool, top_id, days_ago(&clock, 7))
            .await
            .expect("Count failed");
        bench.times.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    results.push(bench);

    // Benchmark: daily buckets over the chart window
    println!("3/6 Daily buckets (30 days)...");
    let mut bench = BenchResult::new("Daily buckets (30d)");
    for _ in 0..iterations {
        let start = Instant::now();
        let times = db::click_times_since(pool, top_id, days_ago(&clock, 30))
            .await
            .expect("Times fetch failed");
        let _ = analytics::group_by_day(&times);
        bench.times.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    results.push(bench);

    // Benchmark: referrer tally
    println!("4/6 Referrer tally...");
    let mut bench = BenchResult::new("Referrer tally");
    for _ in 0..iterations {
        let start = Instant::now();
        let referrers = db::click_referrers(pool, top_id)
            .await
            .expect("Referrer fetch failed");
        let _ = analytics::tally_referrers(&referrers);
        bench.times.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    results.push(bench);

    // Benchmark: device breakdown
    println!("5/6 Device breakdown...");
    let mut bench = BenchResult::new("Device breakdown");
    for _ in 0..iterations {
        let start = Instant::now();
        let devices = db::click_device_types(pool, top_id)
            .await
            .expect("Device fetch failed");
        let _ = analytics::tally_devices(&devices);
        bench.times.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    results.push(bench);

    // Benchmark: full analytics summary, as the endpoint assembles it
    println!("6/6 Full analytics summary...");
    let mut bench = BenchResult::new("Full summary");
    for _ in 0..iterations {
        let start = Instant::now();
        analytics::summarize(pool, &clock, top_id)
            .await
            .expect("Summary failed");
        bench.times.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    results.push(bench);

    // Print results
    println!("\n{}", "=".repeat(80));
    println!("BENCHMARK RESULTS ({} iterations each)", iterations);
    println!("{}", "=".repeat(80));
    println!(
        "{:30} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Query", "Mean", "Median", "P95", "P99", "Max"
    );
    println!("{}", "-".repeat(80));

    for r in &results {
        println!(
            "{:30} {:>9.2}ms {:>9.2}ms {:>9.2}ms {:>9.2}ms {:>9.2}ms",
            r.name,
            r.mean(),
            r.median(),
            r.p95(),
            r.p99(),
            r.max()
        );
    }
    println!("{}", "-".repeat(80));

    // Summary
    let total_mean: f64 = results.iter().map(|r| r.mean()).sum();
    println!(
        "\nTotal analytics page load (sum of means): {:.2}ms",
        total_mean
    );

    if total_mean < 100.0 {
        println!("Performance: EXCELLENT (< 100ms total)");
    } else if total_mean < 500.0 {
        println!("Performance: GOOD (< 500ms total)");
    } else if total_mean < 1000.0 {
        println!("Performance: ACCEPTABLE (< 1s total)");
    } else {
        println!("Performance: NEEDS OPTIMIZATION (> 1s total)");
    }

    let slowest = results
        .iter()
        .max_by(|a, b| a.mean().partial_cmp(&b.mean()).unwrap())
        .unwrap();
    println!(
        "\nSlowest query: {} ({:.2}ms)",
        slowest.name,
        slowest.mean()
    );
}

fn print_usage() {
    eprintln!(
        r#"
Usage: loadtest <command> [options]

Commands:
  seed     Seed the database with test data
  bench    Run benchmarks on existing database

Options for 'seed':
  --db <path>       Database path (default: loadtest.db)
  --clicks <n>      Clicks PER LINK (default: 20000)
  --links <n>       Number of links (default: 50)
  --days <n>        Days of history to generate (default: 30)
  --bench           Run benchmarks after seeding

Options for 'bench':
  --db <path>       Database path (default: loadtest.db)

Examples:
  cargo run --release --bin loadtest -- seed
  cargo run --release --bin loadtest -- seed --clicks 50000 --links 20 --bench
  cargo run --release --bin loadtest -- bench --db ./loadtest.db

After seeding, start the server with:
  LINKLET__DATABASE_PATH=./loadtest.db cargo run --release
"#
    );
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    let mut db_path = PathBuf::from("loadtest.db");
    let mut clicks_per_link = 20_000u64;
    let mut num_links = 50usize;
    let mut days_back = 30u32;
    let mut run_bench = false;

    // Parse arguments
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--db" => {
                i += 1;
                db_path = PathBuf::from(&args[i]);
            }
            "--clicks" => {
                i += 1;
                clicks_per_link = args[i].parse().expect("Invalid clicks count");
            }
            "--links" => {
                i += 1;
                num_links = args[i].parse().expect("Invalid links count");
            }
            "--days" => {
                i += 1;
                days_back = args[i].parse().expect("Invalid days count");
            }
            "--bench" => {
                run_bench = true;
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let db_url = format!("sqlite:{}", db_path.display());

    match command.as_str() {
        "seed" => {
            println!("{}", "=".repeat(60));
            println!("Linklet Load Test - Data Seeder");
            println!("{}", "=".repeat(60));
            println!("Database: {}", db_path.display());
            println!("Links: {}", num_links);
            println!("Clicks per link: {}", clicks_per_link);
            println!("Days of history: {}", days_back);
            println!();

            let pool = create_pool(&db_url).await;
            run_migrations(&pool).await;

            let links = seed_database(&pool, num_links, clicks_per_link, days_back).await;

            // Display links use the same base_url the server serves
            // under, so LINKLET__BASE_URL carries through here too.
            let settings = Settings::new().expect("Failed to load settings");
            println!("\nTop link for viewing:");
            println!("  {}", settings.short_url(&links[0].slug));
            println!("\nAnalytics endpoint:");
            println!(
                "  {}/api/urls/{}/analytics",
                settings.base_url.trim_end_matches('/'),
                links[0].slug
            );
            println!("\nStart the server with:");
            println!(
                "  LINKLET__DATABASE_PATH={} cargo run --release",
                db_path.display()
            );

            if run_bench {
                run_benchmarks(&pool).await;
            }
        }
        "bench" => {
            if !db_path.exists() {
                eprintln!("Database not found: {}", db_path.display());
                eprintln!("Run seeding first: cargo run --release --bin loadtest -- seed");
                std::process::exit(1);
            }

            let pool = create_pool(&db_url).await;
            run_benchmarks(&pool).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}
