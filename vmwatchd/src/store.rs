//! Peak-window storage and retrieval
//!
//! This module persists flushed peak windows and backs the HTTP query API.
//! Uses SQLite for simplicity and reliability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info};

use crate::sink::{MetricsSink, SinkError};
use crate::types::{GpuSample, PeakWindow};

/// One persisted peak window, as returned to API consumers.
#[derive(Debug, Clone, Serialize)]
pub struct StoredWindow {
    pub id: i64,
    pub window_start: i64, // Unix epoch seconds
    pub flushed_at: i64,   // Unix epoch seconds
    pub cpu_percent: Vec<f32>,
    pub mem_used_mb: u64,
    pub mem_total_mb: u64,
    pub disk_used_mb: u64,
    pub disk_total_mb: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuSample>,
}

/// Peak-window storage backed by SQLite
pub struct MetricsStore {
    pool: SqlitePool,
}

impl MetricsStore {
    /// Open (or create) the store at `db_path` and ensure the schema.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, sqlx::Error> {
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        // The UNIQUE window_start makes a retried record of the same
        // unflushed window a no-op instead of a duplicate row.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS peak_windows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                window_start INTEGER NOT NULL UNIQUE,
                flushed_at INTEGER NOT NULL,
                cpu_percent TEXT NOT NULL,
                mem_used_mb INTEGER NOT NULL,
                mem_total_mb INTEGER NOT NULL,
                disk_used_mb INTEGER NOT NULL,
                disk_total_mb INTEGER NOT NULL,
                gpu_percent REAL,
                gpu_mem_used_mb INTEGER,
                gpu_mem_total_mb INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_flushed_at ON peak_windows(flushed_at);
            "#,
        )
        .execute(&pool)
        .await?;

        info!(
            "Peak-window store initialized at {}",
            db_path.as_ref().display()
        );
        Ok(Self { pool })
    }

    /// Insert one flushed window. Returns false when a row with the same
    /// window start already exists (retried flush).
    pub async fn insert(
        &self,
        window: &PeakWindow,
        flushed_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let cpu_json =
            serde_json::to_string(&window.cpu_percent).map_err(|e| sqlx::Error::Encode(e.into()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO peak_windows (
                window_start, flushed_at, cpu_percent,
                mem_used_mb, mem_total_mb, disk_used_mb, disk_total_mb,
                gpu_percent, gpu_mem_used_mb, gpu_mem_total_mb
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(window_start) DO NOTHING
            "#,
        )
        .bind(window.started_at.timestamp())
        .bind(flushed_at.timestamp())
        .bind(cpu_json)
        .bind(window.mem_used_mb as i64)
        .bind(window.mem_total_mb as i64)
        .bind(window.disk_used_mb as i64)
        .bind(window.disk_total_mb as i64)
        .bind(window.gpu.map(|g| g.proc_percent as f64))
        .bind(window.gpu.map(|g| g.mem_used_mb as i64))
        .bind(window.gpu.map(|g| g.mem_total_mb as i64))
        .execute(&self.pool)
        .await?;

        let written = result.rows_affected() > 0;
        if written {
            debug!(
                "Recorded peak window starting at {} (flushed {})",
                window.started_at, flushed_at
            );
        } else {
            debug!(
                "Skipped duplicate peak window starting at {}",
                window.started_at
            );
        }
        Ok(written)
    }

    /// Windows flushed within `[start, end]`, ordered by flush time.
    pub async fn range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredWindow>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, window_start, flushed_at, cpu_percent,
                   mem_used_mb, mem_total_mb, disk_used_mb, disk_total_mb,
                   gpu_percent, gpu_mem_used_mb, gpu_mem_total_mb
            FROM peak_windows
            WHERE flushed_at >= ? AND flushed_at <= ?
            ORDER BY flushed_at ASC
            "#,
        )
        .bind(start.timestamp())
        .bind(end.timestamp())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_window).collect()
    }

    /// Delete windows flushed before `cutoff`, returning the row count.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM peak_windows WHERE flushed_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        info!("Purged {} peak windows flushed before {}", deleted, cutoff);
        Ok(deleted)
    }

    /// Total stored window count.
    pub async fn count(&self) -> Result<u64, sqlx::Error> {
        let row = sqlx::query("SELECT COUNT(*) FROM peak_windows")
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }
}

fn row_to_window(row: sqlx::sqlite::SqliteRow) -> Result<StoredWindow, sqlx::Error> {
    let cpu_json: String = row.get(3);
    let cpu_percent: Vec<f32> =
        serde_json::from_str(&cpu_json).map_err(|e| sqlx::Error::ColumnDecode {
            index: "cpu_percent".to_string(),
            source: e.into(),
        })?;

    let gpu_percent: Option<f64> = row.get(8);
    let gpu_mem_used: Option<i64> = row.get(9);
    let gpu_mem_total: Option<i64> = row.get(10);
    let gpu = match (gpu_percent, gpu_mem_used, gpu_mem_total) {
        (Some(percent), Some(used), Some(total)) => Some(GpuSample {
            proc_percent: percent as f32,
            mem_used_mb: used as u64,
            mem_total_mb: total as u64,
        }),
        _ => None,
    };

    Ok(StoredWindow {
        id: row.get(0),
        window_start: row.get(1),
        flushed_at: row.get(2),
        cpu_percent,
        mem_used_mb: row.get::<i64, _>(4) as u64,
        mem_total_mb: row.get::<i64, _>(5) as u64,
        disk_used_mb: row.get::<i64, _>(6) as u64,
        disk_total_mb: row.get::<i64, _>(7) as u64,
        gpu,
    })
}

#[async_trait]
impl MetricsSink for MetricsStore {
    async fn record(&self, window: &PeakWindow, flushed_at: DateTime<Utc>) -> Result<(), SinkError> {
        self.insert(window, flushed_at)
            .await
            .map(|_| ())
            .map_err(|err| match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                    SinkError::Unavailable
                }
                other => SinkError::WriteFailed(other.to_string()),
            })
    }
}
