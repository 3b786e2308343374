//! Local SQLite database for offline-first record storage
//!
//! Provides:
//! - Per-record keyed persistence (one row per record id)
//! - Append-order listing that survives updates
//! - Atomic single-statement upserts and status updates

use crate::error::{SyncError, SyncResult};
use crate::record::{MedicalRecord, SyncStatus};
use crate::store::{RecordStore, SyncedMark};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

const IN_MEMORY_PATH: &str = ":memory:";

/// Configuration for the local record database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file, or `:memory:`
    pub db_path: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Whether to enable WAL mode
    pub enable_wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "caresync_records.db".to_string(),
            max_connections: 5,
            enable_wal: true,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            db_path: IN_MEMORY_PATH.to_string(),
            max_connections: 1,
            enable_wal: false,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY_PATH
    }
}

/// SQLite-backed [`RecordStore`]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (or create) the record database
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` when the database cannot be opened or the
    /// schema cannot be created.
    pub async fn new(config: &StoreConfig) -> SyncResult<Self> {
        let pool = if config.is_in_memory() {
            // Every connection to :memory: is a separate database, so pin one.
            let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            let mut options = SqliteConnectOptions::new()
                .filename(&config.db_path)
                .create_if_missing(true);
            if config.enable_wal {
                options = options.journal_mode(SqliteJournalMode::Wal);
            }
            SqlitePoolOptions::new()
                .max_connections(config.max_connections.max(1))
                .connect_with(options)
                .await?
        };

        let store = Self { pool };
        store.initialize_schema().await?;

        tracing::info!(db_path = %config.db_path, "Opened local record database");

        Ok(store)
    }

    async fn initialize_schema(&self) -> SyncResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS medical_records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                patient_name TEXT NOT NULL,
                diagnosis TEXT NOT NULL,
                treatment TEXT NOT NULL,
                record_date TEXT NOT NULL,
                created_by TEXT NOT NULL,
                file_path TEXT,
                sync_status TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn record_from_row(row: &SqliteRow) -> SyncResult<MedicalRecord> {
        let status: String = row.try_get("sync_status")?;

        Ok(MedicalRecord {
            id: row.try_get("id")?,
            patient_name: row.try_get("patient_name")?,
            diagnosis: row.try_get("diagnosis")?,
            treatment: row.try_get("treatment")?,
            date: row.try_get("record_date")?,
            created_by: row.try_get("created_by")?,
            file_path: row.try_get("file_path")?,
            sync_status: status.parse().map_err(|e: SyncError| {
                SyncError::StorageUnavailable(format!("corrupt row: {e}"))
            })?,
        })
    }

    /// Get database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close database connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn upsert(&self, record: MedicalRecord) -> SyncResult<()> {
        sqlx::query(
            r#"
            INSERT INTO medical_records (
                id, patient_name, diagnosis, treatment, record_date,
                created_by, file_path, sync_status, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                patient_name = excluded.patient_name,
                diagnosis = excluded.diagnosis,
                treatment = excluded.treatment,
                record_date = excluded.record_date,
                created_by = excluded.created_by,
                file_path = excluded.file_path,
                sync_status = excluded.sync_status,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.patient_name)
        .bind(&record.diagnosis)
        .bind(&record.treatment)
        .bind(&record.date)
        .bind(&record.created_by)
        .bind(&record.file_path)
        .bind(record.sync_status.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            record_id = %record.id,
            status = %record.sync_status,
            "Upserted record"
        );

        Ok(())
    }

    async fn list_all(&self) -> SyncResult<Vec<MedicalRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, patient_name, diagnosis, treatment, record_date,
                   created_by, file_path, sync_status
            FROM medical_records
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn get_by_id(&self, id: &str) -> SyncResult<Option<MedicalRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, patient_name, diagnosis, treatment, record_date,
                   created_by, file_path, sync_status
            FROM medical_records
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn set_sync_status(&self, id: &str, status: SyncStatus) -> SyncResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE medical_records
            SET sync_status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(record_id = id, "Status update for unknown record ignored");
        } else {
            tracing::debug!(record_id = id, status = %status, "Updated sync status");
        }

        Ok(())
    }

    async fn mark_synced_if_unchanged(&self, submitted: &MedicalRecord) -> SyncResult<SyncedMark> {
        // `IS` so a NULL file_path compares equal to a NULL binding
        let result = sqlx::query(
            r#"
            UPDATE medical_records
            SET sync_status = ?, updated_at = ?
            WHERE id = ?
              AND patient_name = ?
              AND diagnosis = ?
              AND treatment = ?
              AND record_date = ?
              AND created_by = ?
              AND file_path IS ?
            "#,
        )
        .bind(SyncStatus::Synced.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(&submitted.id)
        .bind(&submitted.patient_name)
        .bind(&submitted.diagnosis)
        .bind(&submitted.treatment)
        .bind(&submitted.date)
        .bind(&submitted.created_by)
        .bind(&submitted.file_path)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(SyncedMark::Marked);
        }

        let exists = sqlx::query("SELECT 1 FROM medical_records WHERE id = ?")
            .bind(&submitted.id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();

        Ok(if exists {
            SyncedMark::Modified
        } else {
            SyncedMark::Missing
        })
    }
}
