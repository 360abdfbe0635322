//! Upload orchestration: validate, open a session, parse, persist, audit.
//!
//! Validation failures (unknown report type, unknown client) are rejected
//! before any session row exists, so upload history never shows requests
//! that were never accepted. Once a session exists, any pipeline failure
//! marks it failed before the error propagates.

pub mod persist;

use serde::Serialize;
use tracing::{info, warn};

use crate::clients::find_client;
use crate::parsers::{
    ParseError, ParseMetadata, advertising, advertising_bulk, daily_sales, idq, inventory,
    parent_child, product_performance, restocking, search_terms, sku_campaign, sku_ranking,
};
use crate::registry::ReportType;
use crate::session::{
    IngestionLogEntry, NewSession, SessionCounts, SourceType, create_session, get_session,
    log_ingestion, mark_completed, mark_failed, mark_processing,
};
use crate::setup::{SetupContext, open_store};
use crate::state::map_sqlite_error;
use crate::{IngestError, IngestResult};

use persist::SaveOutcome;

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub organization_id: String,
    pub client_id: String,
    pub user_id: String,
    pub report_type: String,
    /// File content. Text reports arrive verbatim; binary reports arrive
    /// base64-encoded (with or without a `data:` URL prefix).
    pub content: String,
    pub file_name: Option<String>,
    pub file_size_bytes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub report_type: &'static str,
    pub session_id: String,
    pub records_processed: i64,
    pub records_inserted: i64,
    pub records_updated: i64,
    pub records_skipped: i64,
    pub errors: Vec<ParseError>,
}

struct PipelineOutput {
    outcome: SaveOutcome,
    metadata: ParseMetadata,
    errors: Vec<ParseError>,
}

pub fn process_upload(
    context: &SetupContext,
    request: &UploadRequest,
) -> IngestResult<UploadOutcome> {
    let report_type = ReportType::from_identifier(&request.report_type)?;
    let mut connection = open_store(context)?;

    let client = find_client(
        &connection,
        &context.db_path,
        &request.client_id,
        &request.organization_id,
    )?
    .ok_or_else(|| IngestError::client_not_found(&request.client_id))?;

    let session_id = create_session(
        &connection,
        &context.db_path,
        &NewSession {
            organization_id: &request.organization_id,
            client_id: &client.client_id,
            user_id: &request.user_id,
            report_type: report_type.identifier(),
            file_name: request.file_name.as_deref(),
            file_size_bytes: request.file_size_bytes,
        },
    )?;
    mark_processing(&connection, &context.db_path, &session_id)?;

    info!(
        session_id = session_id.as_str(),
        client_id = client.client_id.as_str(),
        report_type = report_type.identifier(),
        "processing upload"
    );

    let output = match run_pipeline(&mut connection, context, request, report_type, &session_id) {
        Ok(output) => output,
        Err(error) => {
            fail_session_best_effort(&connection, context, &session_id, &error.message);
            return Err(error);
        }
    };

    let counts = SessionCounts {
        processed: output.metadata.parsed_rows,
        inserted: output.outcome.inserted,
        updated: output.outcome.updated,
        skipped: output.metadata.skipped_rows,
    };
    // Completion is part of the guarded region too: if the final UPDATE
    // fails the session must still leave `processing`.
    if let Err(error) = mark_completed(&connection, &context.db_path, &session_id, counts) {
        fail_session_best_effort(&connection, context, &session_id, &error.message);
        return Err(error);
    }

    info!(
        session_id = session_id.as_str(),
        inserted = counts.inserted,
        updated = counts.updated,
        skipped = counts.skipped,
        "upload completed"
    );

    Ok(UploadOutcome {
        success: true,
        report_type: report_type.identifier(),
        session_id,
        records_processed: counts.processed,
        records_inserted: counts.inserted,
        records_updated: counts.updated,
        records_skipped: counts.skipped,
        errors: output.errors,
    })
}

// Best effort; the original error is what the caller needs.
fn fail_session_best_effort(
    connection: &rusqlite::Connection,
    context: &SetupContext,
    session_id: &str,
    message: &str,
) {
    if let Err(mark_error) = mark_failed(connection, &context.db_path, session_id, message) {
        warn!(
            session_id,
            code = mark_error.code.as_str(),
            "failed to mark upload session as failed"
        );
    }
}

fn run_pipeline(
    connection: &mut rusqlite::Connection,
    context: &SetupContext,
    request: &UploadRequest,
    report_type: ReportType,
    session_id: &str,
) -> IngestResult<PipelineOutput> {
    let db_path = &context.db_path;
    let client_id = request.client_id.as_str();

    let output = match report_type {
        ReportType::DailySales => {
            let result = daily_sales::parse(&request.content);
            let outcome =
                persist::save_daily_sales(connection, db_path, client_id, session_id, &result.data)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::ProductPerformance => {
            let result = product_performance::parse_child_report(&request.content);
            let rows = product_performance::deduplicate(result.data);
            let outcome = persist::save_product_performance(
                connection, db_path, client_id, session_id, &rows,
            )?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::ParentPerformance => {
            let result = product_performance::parse_parent_report(&request.content);
            let rows = product_performance::deduplicate(result.data);
            let outcome = persist::save_parent_performance(
                connection, db_path, client_id, session_id, &rows,
            )?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::SearchTerms => {
            let result = search_terms::parse(&request.content);
            let rows = search_terms::deduplicate(result.data);
            let outcome =
                persist::save_search_terms(connection, db_path, client_id, session_id, &rows)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::Inventory => {
            let result = inventory::parse(&request.content);
            let outcome =
                persist::save_inventory(connection, db_path, client_id, session_id, &result.data)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::Advertising => {
            let result = advertising::parse(&request.content);
            let outcome =
                persist::save_advertising(connection, db_path, client_id, session_id, &result.data)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::AdvertisingBulk => {
            let result = advertising_bulk::parse(
                request.content.as_bytes(),
                request.file_name.as_deref(),
            );
            let rows = advertising_bulk::aggregate_rows(result.data);
            let outcome =
                persist::save_advertising(connection, db_path, client_id, session_id, &rows)?;
            persist::record_sku_campaigns_from_bulk(
                connection, db_path, client_id, session_id, &rows,
            );
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::SkuCampaign => {
            let result = sku_campaign::parse(&request.content);
            let outcome =
                persist::save_sku_campaigns(connection, db_path, client_id, session_id, &result.data)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::ParentChild => {
            let result = parent_child::parse(&request.content);
            let outcome =
                persist::save_parent_child(connection, db_path, client_id, session_id, &result.data)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::Restocking => {
            let result = restocking::parse(&request.content);
            let outcome =
                persist::save_restocking(connection, db_path, client_id, session_id, &result.data)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::IdqScores => {
            let result = idq::parse(&request.content);
            let outcome =
                persist::save_idq_scores(connection, db_path, client_id, session_id, &result.data)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
        ReportType::SkuRankings => {
            let result = sku_ranking::parse(&request.content);
            let outcome =
                persist::save_sku_rankings(connection, db_path, client_id, session_id, &result.data)?;
            PipelineOutput {
                outcome,
                metadata: result.metadata,
                errors: result.errors,
            }
        }
    };

    let record_count = output.outcome.inserted + output.outcome.updated;
    if record_count > 0 {
        let range = output.metadata.date_range.as_ref();
        log_ingestion(
            connection,
            db_path,
            &IngestionLogEntry {
                organization_id: &request.organization_id,
                client_id,
                source_type: SourceType::ManualUpload,
                source_id: session_id,
                table_name: report_type.target_table(),
                operation: "upsert",
                record_count,
                date_range_start: range.map(|r| r.start.as_str()),
                date_range_end: range.map(|r| r.end.as_str()),
                metadata: request.file_name.as_ref().map(|file_name| {
                    serde_json::json!({ "file_name": file_name })
                }),
            },
        )?;
    }

    Ok(output)
}

/// Removes an upload's persisted rows and its audit entries, then the
/// session itself. Report-row and audit-log deletion are best effort; only
/// a failure to delete the session row is fatal.
pub fn delete_upload(context: &SetupContext, session_id: &str) -> IngestResult<()> {
    let connection = open_store(context)?;
    let db_path = &context.db_path;

    let session = get_session(&connection, db_path, session_id)?
        .ok_or_else(|| IngestError::session_not_found(session_id))?;
    let report_type = ReportType::from_identifier(&session.report_type)?;

    let mut tables = vec![report_type.target_table()];
    if report_type == ReportType::AdvertisingBulk {
        // Bulk uploads also write SKU mappings as a side effect.
        tables.push("sku_campaign_mappings");
    }

    for table in tables {
        let delete_sql = format!("DELETE FROM {table} WHERE data_source_id = ?1");
        if let Err(error) = connection.execute(&delete_sql, [session_id]) {
            warn!(
                session_id,
                table,
                error = error.to_string(),
                "failed to delete report rows for upload"
            );
        }
    }

    if let Err(error) = connection.execute(
        "DELETE FROM ingestion_log WHERE source_id = ?1",
        [session_id],
    ) {
        warn!(
            session_id,
            error = error.to_string(),
            "failed to delete audit entries for upload"
        );
    }

    connection
        .execute(
            "DELETE FROM upload_sessions WHERE session_id = ?1",
            [session_id],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    info!(session_id, "upload deleted");
    Ok(())
}
