//! Download log: an append-only SQLite table of finished tasks
//!
//! The bot only appends; the dashboard and the CLI read aggregates.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use serde::Serialize;

use crate::core::error::AppResult;
use crate::storage::migrations::run_migrations;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Terminal status of a logged task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
        }
    }
}

/// Entry to append
#[derive(Debug, Clone)]
pub struct NewDownload {
    pub platform: String,
    pub url: String,
    /// One-decimal megabytes, absent for failures
    pub file_size_mb: Option<String>,
    pub status: DownloadStatus,
}

/// Stored entry as served by `/api/stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRecord {
    pub id: i64,
    pub platform: String,
    pub url: String,
    pub file_size_mb: Option<String>,
    pub status: String,
    /// RFC 3339
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: i64,
}

/// Aggregate served by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadStats {
    pub total_downloads: i64,
    pub platform_stats: Vec<PlatformCount>,
    pub recent_downloads: Vec<DownloadRecord>,
}

/// Create a new database connection pool
///
/// Opens (or creates) the SQLite file and brings the schema up to date.
///
/// # Example
///
/// ```no_run
/// use lashmedia::storage::db;
///
/// let pool = db::create_pool("downloads.sqlite")?;
/// # Ok::<(), lashmedia::core::error::AppError>(())
/// ```
pub fn create_pool(database_path: &str) -> AppResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
    });
    let pool = Pool::builder().max_size(4).build(manager)?;

    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;

    log::info!("Database ready at {}", database_path);
    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> AppResult<DbConnection> {
    Ok(pool.get()?)
}

/// Appends one entry; returns its id.
pub fn append(conn: &Connection, entry: &NewDownload) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO downloads (platform, url, file_size_mb, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.platform,
            entry.url,
            entry.file_size_mb,
            entry.status.as_str(),
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent entries first.
pub fn recent(conn: &Connection, limit: usize) -> AppResult<Vec<DownloadRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, platform, url, file_size_mb, status, created_at
         FROM downloads ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], |row| {
        Ok(DownloadRecord {
            id: row.get(0)?,
            platform: row.get(1)?,
            url: row.get(2)?,
            file_size_mb: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Entry count per platform, most used first.
pub fn platform_counts(conn: &Connection) -> AppResult<Vec<PlatformCount>> {
    let mut stmt = conn.prepare(
        "SELECT platform, COUNT(*) AS n FROM downloads
         GROUP BY platform ORDER BY n DESC, platform ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(PlatformCount {
            platform: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn total(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM downloads", [], |row| row.get(0))?)
}

pub fn stats(conn: &Connection, recent_limit: usize) -> AppResult<DownloadStats> {
    Ok(DownloadStats {
        total_downloads: total(conn)?,
        platform_stats: platform_counts(conn)?,
        recent_downloads: recent(conn, recent_limit)?,
    })
}

/// Fills an empty log with `count` deterministic sample entries.
///
/// Platforms cycle youtube, tiktok, instagram, yandexmusic; every fourth
/// entry is a failure. Returns the number inserted (0 if the log had data).
pub fn seed_demo(conn: &Connection, count: usize) -> AppResult<usize> {
    if total(conn)? > 0 {
        return Ok(0);
    }

    const PLATFORMS: [&str; 4] = ["youtube", "tiktok", "instagram", "yandexmusic"];
    for i in 0..count {
        let platform = PLATFORMS[i % PLATFORMS.len()];
        let failed = i % 4 == 3;
        let entry = NewDownload {
            platform: platform.to_string(),
            url: format!("https://{}.com/example/{}", platform, i),
            file_size_mb: (!failed).then(|| format!("{:.1}", 2.0 + ((i * 37) % 480) as f64 / 10.0)),
            status: if failed {
                DownloadStatus::Failed
            } else {
                DownloadStatus::Completed
            },
        };
        append(conn, &entry)?;
    }
    Ok(count)
}

/// Async facade over the pool; queries run on the blocking thread pool.
#[derive(Clone)]
pub struct DownloadLog {
    pool: DbPool,
}

impl DownloadLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, entry: NewDownload) -> AppResult<i64> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_connection(&pool)?;
            append(&conn, &entry)
        })
        .await?
    }

    pub async fn stats(&self, recent_limit: usize) -> AppResult<DownloadStats> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_connection(&pool)?;
            stats(&conn, recent_limit)
        })
        .await?
    }
}
