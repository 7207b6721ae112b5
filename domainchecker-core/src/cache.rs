//! Persistent snapshot cache on a single SQLite file.
//!
//! One row per domain holding the JSON-serialized [`DomainSnapshot`] plus
//! creation and expiry timestamps (fractional epoch seconds). Expiry is
//! re-checked on every read, so an expired row is a miss even before the
//! periodic sweep removes it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{CheckerError, Result};
use crate::snapshot::DomainSnapshot;
use crate::validation::normalize_domain;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Expired rows are swept after this many writes.
const DEFAULT_SWEEP_INTERVAL: u64 = 100;

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS domain_cache (
        domain TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        created_at REAL NOT NULL,
        expires_at REAL NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_domain_cache_expires_at ON domain_cache (expires_at)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub active_entries: u64,
    pub expired_entries: u64,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub struct CacheStore {
    pool: SqlitePool,
    path: PathBuf,
    default_ttl: Duration,
    sweep_interval: u64,
    writes: AtomicU64,
}

fn epoch_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

impl CacheStore {
    /// Open (creating if needed) the cache file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Failed to open cache database");
                CheckerError::from(e)
            })?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }

        debug!(path = %path.display(), "Cache store opened");
        Ok(Self {
            pool,
            path,
            default_ttl: DEFAULT_CACHE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            writes: AtomicU64::new(0),
        })
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sweep expired rows every `writes` puts. Zero disables sweeping.
    pub fn with_sweep_interval(mut self, writes: u64) -> Self {
        self.sweep_interval = writes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Fetch a live snapshot. Missing and expired entries are both `None`.
    #[instrument(skip(self))]
    pub async fn get(&self, domain: &str) -> Result<Option<DomainSnapshot>> {
        let key = normalize_domain(domain);

        let row = sqlx::query_as::<_, (String,)>(
            "SELECT data FROM domain_cache WHERE domain = ? AND expires_at > ?",
        )
        .bind(&key)
        .bind(epoch_now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to read cache entry");
            CheckerError::from(e)
        })?;

        match row {
            Some((data,)) => {
                debug!("Cache hit");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    /// Store a snapshot under the default TTL.
    pub async fn put(&self, domain: &str, snapshot: &DomainSnapshot) -> Result<()> {
        self.put_with_ttl(domain, snapshot, self.default_ttl).await
    }

    /// Upsert a snapshot; the previous entry for the domain, if any, is
    /// replaced.
    #[instrument(skip(self, snapshot))]
    pub async fn put_with_ttl(
        &self,
        domain: &str,
        snapshot: &DomainSnapshot,
        ttl: Duration,
    ) -> Result<()> {
        let key = normalize_domain(domain);
        let data = serde_json::to_string(snapshot)?;
        let created_at = epoch_now();
        let expires_at = created_at + ttl.as_secs_f64();

        sqlx::query(
            "INSERT INTO domain_cache (domain, data, created_at, expires_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(domain) DO UPDATE SET
                data = excluded.data,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
        )
        .bind(&key)
        .bind(&data)
        .bind(created_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to write cache entry");
            CheckerError::from(e)
        })?;

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if self.sweep_interval > 0 && writes % self.sweep_interval == 0 {
            if let Err(e) = self.cleanup_expired().await {
                warn!(error = %e, "Cache sweep failed");
            }
        }

        Ok(())
    }

    /// Returns whether an entry was removed.
    pub async fn delete(&self, domain: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM domain_cache WHERE domain = ?")
            .bind(normalize_domain(domain))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every entry. Returns the number removed.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM domain_cache")
            .execute(&self.pool)
            .await?;
        info!(removed = result.rows_affected(), "Cache cleared");
        Ok(result.rows_affected())
    }

    /// Physically delete expired rows. Returns the number removed.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM domain_cache WHERE expires_at <= ?")
            .bind(epoch_now())
            .execute(&self.pool)
            .await?;
        debug!(removed = result.rows_affected(), "Swept expired cache entries");
        Ok(result.rows_affected())
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let (total, active) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN expires_at > ? THEN 1 ELSE 0 END), 0)
             FROM domain_cache",
        )
        .bind(epoch_now())
        .fetch_one(&self.pool)
        .await?;

        let page_count: i64 = sqlx::query_scalar("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await?;
        let page_size: i64 = sqlx::query_scalar("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await?;

        Ok(CacheStats {
            total_entries: total as u64,
            active_entries: active as u64,
            expired_entries: (total - active) as u64,
            size_bytes: (page_count * page_size) as u64,
        })
    }

    /// Close the pool, flushing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
