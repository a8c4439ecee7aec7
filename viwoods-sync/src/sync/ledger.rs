use std::path::{Path, PathBuf};

use md5::Context as Md5Context;
use sqlx::{Row, SqlitePool, migrate::Migrator, sqlite::SqliteConnectOptions};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::io::AsyncReadExt;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Name of the ledger database inside the output root.
pub const LEDGER_FILE_NAME: &str = ".sync_db.sqlite";

const CHECKSUM_CHUNK: usize = 8192;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timestamp formatting error: {0}")]
    Time(#[from] time::error::Format),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    pub remote_path: String,
    pub note_id: String,
    pub update_time: i64,
    pub file_size: i64,
    pub last_sync: String,
    pub checksum: String,
}

/// Persistent bookkeeping of which notes have been mirrored and at which
/// remote update time.
pub struct SyncLedger {
    pool: SqlitePool,
}

impl SyncLedger {
    pub async fn open(db_path: &Path) -> Result<Self, LedgerError> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let ledger = Self { pool };
        ledger.init().await?;
        Ok(ledger)
    }

    pub async fn open_in(output_root: &Path) -> Result<Self, LedgerError> {
        Self::open(&ledger_path(output_root)).await
    }

    pub async fn init(&self) -> Result<(), LedgerError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    /// True iff a record exists and its stored update time is not older than
    /// `remote_update_time`.
    pub async fn is_up_to_date(
        &self,
        remote_path: &str,
        remote_update_time: i64,
    ) -> Result<bool, LedgerError> {
        let stored: Option<i64> =
            sqlx::query_scalar("SELECT update_time FROM synced_files WHERE file_path = ?1")
                .bind(remote_path)
                .fetch_optional(&self.pool)
                .await?;
        Ok(stored.is_some_and(|stored| stored >= remote_update_time))
    }

    pub async fn record_sync(
        &self,
        remote_path: &str,
        note_id: &str,
        update_time: i64,
        file_size: u64,
        local_file: &Path,
    ) -> Result<SyncRecord, LedgerError> {
        let record = SyncRecord {
            remote_path: remote_path.to_string(),
            note_id: note_id.to_string(),
            update_time,
            file_size: i64::try_from(file_size).unwrap_or(i64::MAX),
            last_sync: OffsetDateTime::now_utc().format(&Rfc3339)?,
            checksum: file_checksum(local_file).await?,
        };

        sqlx::query(
            "INSERT INTO synced_files (file_path, note_id, update_time, file_size, last_sync, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(file_path) DO UPDATE SET
                note_id = excluded.note_id,
                update_time = excluded.update_time,
                file_size = excluded.file_size,
                last_sync = excluded.last_sync,
                checksum = excluded.checksum",
        )
        .bind(&record.remote_path)
        .bind(&record.note_id)
        .bind(record.update_time)
        .bind(record.file_size)
        .bind(&record.last_sync)
        .bind(&record.checksum)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn get_record(&self, remote_path: &str) -> Result<Option<SyncRecord>, LedgerError> {
        let row = sqlx::query(
            "SELECT file_path, note_id, update_time, file_size, last_sync, checksum
             FROM synced_files WHERE file_path = ?1",
        )
        .bind(remote_path)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(SyncRecord {
            remote_path: row.try_get("file_path")?,
            note_id: row.try_get("note_id")?,
            update_time: row.try_get("update_time")?,
            file_size: row.try_get("file_size")?,
            last_sync: row.try_get("last_sync")?,
            checksum: row.try_get("checksum")?,
        }))
    }

    pub async fn count(&self) -> Result<u64, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM synced_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Forgets every recorded sync so the next run fetches everything again.
    pub async fn reset(&self) -> Result<(), LedgerError> {
        sqlx::query("DELETE FROM synced_files")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

pub fn ledger_path(output_root: &Path) -> PathBuf {
    output_root.join(LEDGER_FILE_NAME)
}

/// Hex MD5 digest of the whole file.
pub async fn file_checksum(path: &Path) -> Result<String, std::io::Error> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut ctx = Md5Context::new();
    let mut buf = vec![0u8; CHECKSUM_CHUNK];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        ctx.consume(&buf[..read]);
    }
    Ok(format!("{:x}", ctx.compute()))
}
