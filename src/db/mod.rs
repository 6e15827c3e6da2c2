use chrono::{DateTime, Utc};

use crate::domain::{Click, ClickId, CreateClick, CreateLink, DeviceType, Link, LinkId, Slug};
use crate::error::{Error, Result};

#[cfg(feature = "postgres")]
pub type Pool = sqlx::PgPool;
#[cfg(feature = "postgres")]
pub type PoolOptions = sqlx::postgres::PgPoolOptions;

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type Pool = sqlx::SqlitePool;
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type PoolOptions = sqlx::sqlite::SqlitePoolOptions;

pub async fn create_pool(url: &str) -> Result<Pool> {
    let pool = PoolOptions::new().max_connections(10).connect(url).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    #[cfg(feature = "postgres")]
    {
        let sql = include_str!("../../migrations/postgres/001_initial.sql");
        sqlx::raw_sql(sql).execute(pool).await?;
    }

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    {
        let sql = include_str!("../../migrations/sqlite/001_initial.sql");
        sqlx::raw_sql(sql).execute(pool).await?;
    }

    Ok(())
}

// Link queries

pub async fn get_link_by_slug(pool: &Pool, slug: &Slug) -> Result<Link> {
    #[cfg(feature = "postgres")]
    let row: LinkRow = sqlx::query_as(
        r#"SELECT id, slug, target_url, created_at, expires_at, clicks_count
           FROM links WHERE slug = $1"#,
    )
    .bind(slug.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(Error::LinkNotFound)?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let row: LinkRow = sqlx::query_as(
        r#"SELECT id, slug, target_url, created_at, expires_at, clicks_count
           FROM links WHERE slug = ?"#,
    )
    .bind(slug.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(Error::LinkNotFound)?;

    Ok(row.into())
}

pub async fn slug_exists(pool: &Pool, slug: &Slug) -> Result<bool> {
    #[cfg(feature = "postgres")]
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE slug = $1")
        .bind(slug.as_str())
        .fetch_one(pool)
        .await?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let count: i64 = {
        let count: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE slug = ?")
            .bind(slug.as_str())
            .fetch_one(pool)
            .await?;
        count as i64
    };

    Ok(count > 0)
}

pub async fn create_link(pool: &Pool, input: CreateLink, now: DateTime<Utc>) -> Result<Link> {
    let id = LinkId::new();

    #[cfg(feature = "postgres")]
    sqlx::query(
        r#"INSERT INTO links (id, slug, target_url, created_at, expires_at, clicks_count)
           VALUES ($1, $2, $3, $4, $5, 0)"#,
    )
    .bind(id.0)
    .bind(input.slug.as_str())
    .bind(&input.target_url)
    .bind(now)
    .bind(input.expires_at)
    .execute(pool)
    .await?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    sqlx::query(
        r#"INSERT INTO links (id, slug, target_url, created_at, expires_at, clicks_count)
           VALUES (?, ?, ?, ?, ?, 0)"#,
    )
    .bind(id.0.to_string())
    .bind(input.slug.as_str())
    .bind(&input.target_url)
    .bind(now.to_rfc3339())
    .bind(input.expires_at.map(|at| at.to_rfc3339()))
    .execute(pool)
    .await?;

    get_link_by_slug(pool, &input.slug).await
}

pub async fn list_links(pool: &Pool) -> Result<Vec<Link>> {
    #[cfg(feature = "postgres")]
    let rows: Vec<LinkRow> = sqlx::query_as(
        r#"SELECT id, slug, target_url, created_at, expires_at, clicks_count
           FROM links ORDER BY created_at DESC"#,
    )
    .fetch_all(pool)
    .await?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let rows: Vec<LinkRow> = sqlx::query_as(
        r#"SELECT id, slug, target_url, created_at, expires_at, clicks_count
           FROM links ORDER BY created_at DESC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

// Click queries

pub async fn get_click(pool: &Pool, id: ClickId) -> Result<Click> {
    #[cfg(feature = "postgres")]
    let row: ClickRow = sqlx::query_as(
        r#"SELECT id, link_id, created_at, referrer, user_agent, device_type
           FROM clicks WHERE id = $1"#,
    )
    .bind(id.0)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::Database(sqlx::Error::RowNotFound))?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let row: ClickRow = sqlx::query_as(
        r#"SELECT id, link_id, created_at, referrer, user_agent, device_type
           FROM clicks WHERE id = ?"#,
    )
    .bind(id.0)
    .fetch_optional(pool)
    .await?
    .ok_or(Error::Database(sqlx::Error::RowNotFound))?;

    Ok(row.into())
}

/// Append one click row. The AFTER INSERT trigger installed by the
/// migrations bumps the owning link's `clicks_count`.
pub async fn create_click(pool: &Pool, input: CreateClick, now: DateTime<Utc>) -> Result<Click> {
    #[cfg(feature = "postgres")]
    let id: i64 = sqlx::query_scalar(
        r#"INSERT INTO clicks (link_id, created_at, referrer, user_agent, device_type)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id"#,
    )
    .bind(input.link_id.0)
    .bind(now)
    .bind(&input.referrer)
    .bind(&input.user_agent)
    .bind(input.device_type.as_str())
    .fetch_one(pool)
    .await?;

    // RETURNING keeps the id on the same statement; a separate
    // last_insert_rowid() read could land on another pool connection.
    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let id: i64 = sqlx::query_scalar(
        r#"INSERT INTO clicks (link_id, created_at, referrer, user_agent, device_type)
           VALUES (?, ?, ?, ?, ?)
           RETURNING id"#,
    )
    .bind(input.link_id.0.to_string())
    .bind(now.to_rfc3339())
    .bind(&input.referrer)
    .bind(&input.user_agent)
    .bind(input.device_type.as_str())
    .fetch_one(pool)
    .await?;

    get_click(pool, ClickId(id)).await
}

pub async fn count_clicks(pool: &Pool, link_id: LinkId) -> Result<i64> {
    #[cfg(feature = "postgres")]
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE link_id = $1")
        .bind(link_id.0)
        .fetch_one(pool)
        .await?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let count: i64 = {
        let count: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE link_id = ?")
            .bind(link_id.0.to_string())
            .fetch_one(pool)
            .await?;
        count as i64
    };

    Ok(count)
}

pub async fn count_clicks_since(
    pool: &Pool,
    link_id: LinkId,
    since: DateTime<Utc>,
) -> Result<i64> {
    #[cfg(feature = "postgres")]
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE link_id = $1 AND created_at >= $2")
            .bind(link_id.0)
            .bind(since)
            .fetch_one(pool)
            .await?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let count: i64 = {
        let count: i32 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM clicks WHERE link_id = ? AND created_at >= ?",
        )
        .bind(link_id.0.to_string())
        .bind(since.to_rfc3339())
        .fetch_one(pool)
        .await?;
        count as i64
    };

    Ok(count)
}

/// Click timestamps for one link from `since` onward, ascending.
pub async fn click_times_since(
    pool: &Pool,
    link_id: LinkId,
    since: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>> {
    #[cfg(feature = "postgres")]
    let times: Vec<DateTime<Utc>> = {
        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            r#"SELECT created_at FROM clicks
               WHERE link_id = $1 AND created_at >= $2
               ORDER BY created_at"#,
        )
        .bind(link_id.0)
        .bind(since)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(|(t,)| t).collect()
    };

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let times: Vec<DateTime<Utc>> = {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT created_at FROM clicks
               WHERE link_id = ? AND created_at >= ?
               ORDER BY created_at"#,
        )
        .bind(link_id.0.to_string())
        .bind(since.to_rfc3339())
        .fetch_all(pool)
        .await?;
        rows.into_iter()
            .filter_map(|(t,)| {
                DateTime::parse_from_rfc3339(&t)
                    .ok()
                    .map(|d| d.with_timezone(&Utc))
            })
            .collect()
    };

    Ok(times)
}

/// Raw referrer values of every click for one link, unbounded window.
/// NULL rows come back as None.
pub async fn click_referrers(pool: &Pool, link_id: LinkId) -> Result<Vec<Option<String>>> {
    #[cfg(feature = "postgres")]
    let rows: Vec<(Option<String>,)> =
        sqlx::query_as("SELECT referrer FROM clicks WHERE link_id = $1")
            .bind(link_id.0)
            .fetch_all(pool)
            .await?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let rows: Vec<(Option<String>,)> =
        sqlx::query_as("SELECT referrer FROM clicks WHERE link_id = ?")
            .bind(link_id.0.to_string())
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(r,)| r).collect())
}

/// Stored device-type labels of every click for one link, unbounded window.
pub async fn click_device_types(pool: &Pool, link_id: LinkId) -> Result<Vec<Option<String>>> {
    #[cfg(feature = "postgres")]
    let rows: Vec<(Option<String>,)> =
        sqlx::query_as("SELECT device_type FROM clicks WHERE link_id = $1")
            .bind(link_id.0)
            .fetch_all(pool)
            .await?;

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    let rows: Vec<(Option<String>,)> =
        sqlx::query_as("SELECT device_type FROM clicks WHERE link_id = ?")
            .bind(link_id.0.to_string())
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(d,)| d).collect())
}

// Row types for SQLx mapping - PostgreSQL versions

#[cfg(feature = "postgres")]
#[derive(sqlx::FromRow)]
struct LinkRow {
    id: uuid::Uuid,
    slug: String,
    target_url: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    clicks_count: i64,
}

#[cfg(feature = "postgres")]
impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Self {
            id: LinkId(row.id),
            slug: Slug(row.slug),
            target_url: row.target_url,
            created_at: row.created_at,
            expires_at: row.expires_at,
            clicks_count: row.clicks_count,
        }
    }
}

#[cfg(feature = "postgres")]
#[derive(sqlx::FromRow)]
struct ClickRow {
    id: i64,
    link_id: uuid::Uuid,
    created_at: DateTime<Utc>,
    referrer: Option<String>,
    user_agent: Option<String>,
    device_type: Option<String>,
}

#[cfg(feature = "postgres")]
impl From<ClickRow> for Click {
    fn from(row: ClickRow) -> Self {
        Self {
            id: ClickId(row.id),
            link_id: LinkId(row.link_id),
            created_at: row.created_at,
            referrer: row.referrer,
            user_agent: row.user_agent,
            device_type: row
                .device_type
                .as_deref()
                .map(DeviceType::from_str)
                .unwrap_or_default(),
        }
    }
}

// Row types for SQLx mapping - SQLite versions (UUIDs and timestamps stored as TEXT)

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
#[derive(sqlx::FromRow)]
struct LinkRow {
    id: String,
    slug: String,
    target_url: String,
    created_at: String,
    expires_at: Option<String>,
    clicks_count: i64,
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Self {
            id: LinkId(row.id.parse().unwrap_or_default()),
            slug: Slug(row.slug),
            target_url: row.target_url,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            expires_at: row.expires_at.and_then(|at| {
                DateTime::parse_from_rfc3339(&at)
                    .ok()
                    .map(|d| d.with_timezone(&Utc))
            }),
            clicks_count: row.clicks_count,
        }
    }
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
#[derive(sqlx::FromRow)]
struct ClickRow {
    id: i64,
    link_id: String,
    created_at: String,
    referrer: Option<String>,
    user_agent: Option<String>,
    device_type: Option<String>,
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
impl From<ClickRow> for Click {
    fn from(row: ClickRow) -> Self {
        Self {
            id: ClickId(row.id),
            link_id: LinkId(row.link_id.parse().unwrap_or_default()),
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            referrer: row.referrer,
            user_agent: row.user_agent,
            device_type: row
                .device_type
                .as_deref()
                .map(DeviceType::from_str)
                .unwrap_or_default(),
        }
    }
}
