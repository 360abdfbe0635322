//! Upload session lifecycle and the append-only ingestion audit log.
//!
//! Each upload gets a durable session row that moves
//! pending → processing → completed | failed. The terminal states are final:
//! the guarded UPDATEs below refuse to move a completed or failed session,
//! so a crash mid-pipeline can never resurrect one.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde_json::Value;
use ulid::Ulid;

use crate::state::map_sqlite_error;
use crate::{IngestError, IngestResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    ManualUpload,
    SpApi,
    AdvertisingApi,
    KeepaApi,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManualUpload => "manual_upload",
            Self::SpApi => "sp_api",
            Self::AdvertisingApi => "advertising_api",
            Self::KeepaApi => "keepa_api",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSession<'a> {
    pub organization_id: &'a str,
    pub client_id: &'a str,
    pub user_id: &'a str,
    pub report_type: &'a str,
    pub file_name: Option<&'a str>,
    pub file_size_bytes: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCounts {
    pub processed: i64,
    pub inserted: i64,
    pub updated: i64,
    pub skipped: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadSession {
    pub session_id: String,
    pub organization_id: String,
    pub client_id: String,
    pub user_id: String,
    pub report_type: String,
    pub file_name: Option<String>,
    pub file_size_bytes: i64,
    pub status: String,
    pub records_processed: i64,
    pub records_inserted: i64,
    pub records_updated: i64,
    pub records_skipped: i64,
    pub error_message: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadHistoryEntry {
    #[serde(flatten)]
    pub session: UploadSession,
    pub client_display_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestionLogEntry<'a> {
    pub organization_id: &'a str,
    pub client_id: &'a str,
    pub source_type: SourceType,
    pub source_id: &'a str,
    pub table_name: &'a str,
    pub operation: &'a str,
    pub record_count: i64,
    pub date_range_start: Option<&'a str>,
    pub date_range_end: Option<&'a str>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionLogRecord {
    pub log_id: String,
    pub client_id: String,
    pub source_type: String,
    pub source_id: String,
    pub table_name: String,
    pub operation: String,
    pub record_count: i64,
    pub date_range_start: Option<String>,
    pub date_range_end: Option<String>,
    pub created_at: String,
}

pub fn create_session(
    connection: &Connection,
    db_path: &Path,
    new_session: &NewSession<'_>,
) -> IngestResult<String> {
    let session_id = format!("ses_{}", Ulid::new());
    connection
        .execute(
            "INSERT INTO upload_sessions (
                session_id,
                organization_id,
                client_id,
                user_id,
                report_type,
                file_name,
                file_size_bytes,
                status,
                started_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &session_id,
                new_session.organization_id,
                new_session.client_id,
                new_session.user_id,
                new_session.report_type,
                new_session.file_name,
                new_session.file_size_bytes,
                SessionStatus::Pending.as_str(),
                now_timestamp()
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(session_id)
}

pub fn mark_processing(
    connection: &Connection,
    db_path: &Path,
    session_id: &str,
) -> IngestResult<()> {
    transition(
        connection,
        db_path,
        session_id,
        "UPDATE upload_sessions
         SET status = 'processing'
         WHERE session_id = ?1 AND status NOT IN ('completed', 'failed')",
        params![session_id],
    )
}

pub fn mark_completed(
    connection: &Connection,
    db_path: &Path,
    session_id: &str,
    counts: SessionCounts,
) -> IngestResult<()> {
    transition(
        connection,
        db_path,
        session_id,
        "UPDATE upload_sessions
         SET status = 'completed',
             records_processed = ?2,
             records_inserted = ?3,
             records_updated = ?4,
             records_skipped = ?5,
             completed_at = ?6
         WHERE session_id = ?1 AND status NOT IN ('completed', 'failed')",
        params![
            session_id,
            counts.processed,
            counts.inserted,
            counts.updated,
            counts.skipped,
            now_timestamp()
        ],
    )
}

pub fn mark_failed(
    connection: &Connection,
    db_path: &Path,
    session_id: &str,
    error_message: &str,
) -> IngestResult<()> {
    transition(
        connection,
        db_path,
        session_id,
        "UPDATE upload_sessions
         SET status = 'failed',
             error_message = ?2,
             completed_at = ?3
         WHERE session_id = ?1 AND status NOT IN ('completed', 'failed')",
        params![session_id, error_message, now_timestamp()],
    )
}

fn transition(
    connection: &Connection,
    db_path: &Path,
    session_id: &str,
    sql: &str,
    parameters: impl rusqlite::Params,
) -> IngestResult<()> {
    let affected = connection
        .execute(sql, parameters)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    if affected == 0 && get_session(connection, db_path, session_id)?.is_none() {
        return Err(IngestError::session_not_found(session_id));
    }
    // affected == 0 with an existing row means the session already reached a
    // terminal state; that state wins.
    Ok(())
}

pub fn get_session(
    connection: &Connection,
    db_path: &Path,
    session_id: &str,
) -> IngestResult<Option<UploadSession>> {
    connection
        .query_row(
            "SELECT session_id, organization_id, client_id, user_id, report_type, file_name,
                    file_size_bytes, status, records_processed, records_inserted,
                    records_updated, records_skipped, error_message, started_at, completed_at
             FROM upload_sessions
             WHERE session_id = ?1
             LIMIT 1",
            params![session_id],
            session_from_row,
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub fn log_ingestion(
    connection: &Connection,
    db_path: &Path,
    entry: &IngestionLogEntry<'_>,
) -> IngestResult<()> {
    let log_id = format!("log_{}", Ulid::new());
    let metadata_json = match &entry.metadata {
        Some(value) => Some(
            serde_json::to_string(value)
                .map_err(|error| IngestError::internal_serialization(&error.to_string()))?,
        ),
        None => None,
    };

    connection
        .execute(
            "INSERT INTO ingestion_log (
                log_id,
                organization_id,
                client_id,
                source_type,
                source_id,
                table_name,
                operation,
                record_count,
                date_range_start,
                date_range_end,
                metadata,
                created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                &log_id,
                entry.organization_id,
                entry.client_id,
                entry.source_type.as_str(),
                entry.source_id,
                entry.table_name,
                entry.operation,
                entry.record_count,
                entry.date_range_start,
                entry.date_range_end,
                metadata_json,
                now_timestamp()
            ],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(())
}

pub fn upload_history(
    connection: &Connection,
    db_path: &Path,
    organization_id: &str,
    client_filter: Option<&str>,
    limit: i64,
    offset: i64,
) -> IngestResult<Vec<UploadHistoryEntry>> {
    let mut statement = connection
        .prepare(
            "SELECT s.session_id, s.organization_id, s.client_id, s.user_id, s.report_type,
                    s.file_name, s.file_size_bytes, s.status, s.records_processed,
                    s.records_inserted, s.records_updated, s.records_skipped, s.error_message,
                    s.started_at, s.completed_at, c.display_name
             FROM upload_sessions s
             LEFT JOIN clients c ON c.client_id = s.client_id
             WHERE s.organization_id = ?1
               AND (?2 IS NULL OR s.client_id = ?2)
             ORDER BY s.started_at DESC
             LIMIT ?3 OFFSET ?4",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows = statement
        .query_map(
            params![organization_id, client_filter, limit, offset],
            |row| {
                Ok(UploadHistoryEntry {
                    session: session_from_row(row)?,
                    client_display_name: row.get(15)?,
                })
            },
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut history = Vec::new();
    for row in rows {
        history.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(history)
}

pub fn ingestion_log_for_client(
    connection: &Connection,
    db_path: &Path,
    client_id: &str,
    source_filter: Option<SourceType>,
) -> IngestResult<Vec<IngestionLogRecord>> {
    let mut statement = connection
        .prepare(
            "SELECT log_id, client_id, source_type, source_id, table_name, operation,
                    record_count, date_range_start, date_range_end, created_at
             FROM ingestion_log
             WHERE client_id = ?1
               AND (?2 IS NULL OR source_type = ?2)
             ORDER BY created_at DESC",
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let rows = statement
        .query_map(
            params![client_id, source_filter.map(|source| source.as_str())],
            |row| {
                Ok(IngestionLogRecord {
                    log_id: row.get(0)?,
                    client_id: row.get(1)?,
                    source_type: row.get(2)?,
                    source_id: row.get(3)?,
                    table_name: row.get(4)?,
                    operation: row.get(5)?,
                    record_count: row.get(6)?,
                    date_range_start: row.get(7)?,
                    date_range_end: row.get(8)?,
                    created_at: row.get(9)?,
                })
            },
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut entries = Vec::new();
    for row in rows {
        entries.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }
    Ok(entries)
}

fn session_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UploadSession> {
    Ok(UploadSession {
        session_id: row.get(0)?,
        organization_id: row.get(1)?,
        client_id: row.get(2)?,
        user_id: row.get(3)?,
        report_type: row.get(4)?,
        file_name: row.get(5)?,
        file_size_bytes: row.get(6)?,
        status: row.get(7)?,
        records_processed: row.get(8)?,
        records_inserted: row.get(9)?,
        records_updated: row.get(10)?,
        records_skipped: row.get(11)?,
        error_message: row.get(12)?,
        started_at: row.get(13)?,
        completed_at: row.get(14)?,
    })
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
