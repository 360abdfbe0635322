use std::path::PathBuf;

use sellerdeck_ingest::session::{
    IngestionLogEntry, NewSession, SessionCounts, SourceType, create_session, get_session,
    ingestion_log_for_client, log_ingestion, mark_completed, mark_failed, mark_processing,
};
use sellerdeck_ingest::setup::{SetupContext, ensure_initialized_at, open_store};
use tempfile::tempdir;

fn initialized_context() -> Option<(tempfile::TempDir, SetupContext)> {
    let temp = tempdir();
    assert!(temp.is_ok());
    let temp_dir = temp.ok()?;
    let home: PathBuf = temp_dir.path().join("sellerdeck-home");
    let context = ensure_initialized_at(&home);
    assert!(context.is_ok());
    Some((temp_dir, context.ok()?))
}

fn new_session<'a>() -> NewSession<'a> {
    NewSession {
        organization_id: "org_test",
        client_id: "cli_acme",
        user_id: "usr_tester",
        report_type: "daily_sales",
        file_name: Some("report.csv"),
        file_size_bytes: 1024,
    }
}

#[test]
fn session_moves_through_the_status_lifecycle() {
    let Some((_temp, context)) = initialized_context() else {
        return;
    };
    let connection = open_store(&context);
    assert!(connection.is_ok());
    if let Ok(connection) = connection {
        let session_id = create_session(&connection, &context.db_path, &new_session());
        assert!(session_id.is_ok());
        let Ok(session_id) = session_id else {
            return;
        };

        let fetched = get_session(&connection, &context.db_path, &session_id);
        assert!(fetched.is_ok());
        if let Ok(Some(session)) = fetched {
            assert_eq!(session.status, "pending");
            assert!(session.completed_at.is_none());
        }

        assert!(mark_processing(&connection, &context.db_path, &session_id).is_ok());
        let counts = SessionCounts {
            processed: 10,
            inserted: 7,
            updated: 2,
            skipped: 1,
        };
        assert!(mark_completed(&connection, &context.db_path, &session_id, counts).is_ok());

        let completed = get_session(&connection, &context.db_path, &session_id);
        assert!(completed.is_ok());
        if let Ok(Some(session)) = completed {
            assert_eq!(session.status, "completed");
            assert_eq!(session.records_inserted, 7);
            assert_eq!(session.records_skipped, 1);
            assert!(session.completed_at.is_some());
        }
    }
}

#[test]
fn terminal_states_cannot_be_overwritten() {
    let Some((_temp, context)) = initialized_context() else {
        return;
    };
    let connection = open_store(&context);
    assert!(connection.is_ok());
    if let Ok(connection) = connection {
        let session_id = create_session(&connection, &context.db_path, &new_session());
        assert!(session_id.is_ok());
        let Ok(session_id) = session_id else {
            return;
        };

        assert!(mark_failed(&connection, &context.db_path, &session_id, "parse blew up").is_ok());

        // Late transitions are silently ignored, not errors.
        assert!(mark_processing(&connection, &context.db_path, &session_id).is_ok());
        let late_completion = mark_completed(
            &connection,
            &context.db_path,
            &session_id,
            SessionCounts::default(),
        );
        assert!(late_completion.is_ok());

        let fetched = get_session(&connection, &context.db_path, &session_id);
        assert!(fetched.is_ok());
        if let Ok(Some(session)) = fetched {
            assert_eq!(session.status, "failed");
            assert_eq!(session.error_message.as_deref(), Some("parse blew up"));
        }
    }
}

#[test]
fn transitions_on_unknown_sessions_report_session_not_found() {
    let Some((_temp, context)) = initialized_context() else {
        return;
    };
    let connection = open_store(&context);
    assert!(connection.is_ok());
    if let Ok(connection) = connection {
        let result = mark_processing(&connection, &context.db_path, "ses_missing");
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "session_not_found");
        }
    }
}

#[test]
fn ingestion_log_filters_by_source_type() {
    let Some((_temp, context)) = initialized_context() else {
        return;
    };
    let connection = open_store(&context);
    assert!(connection.is_ok());
    if let Ok(connection) = connection {
        let manual = log_ingestion(
            &connection,
            &context.db_path,
            &IngestionLogEntry {
                organization_id: "org_test",
                client_id: "cli_acme",
                source_type: SourceType::ManualUpload,
                source_id: "ses_one",
                table_name: "daily_sales",
                operation: "upsert",
                record_count: 5,
                date_range_start: Some("2025-01-01"),
                date_range_end: Some("2025-01-31"),
                metadata: Some(serde_json::json!({ "file_name": "report.csv" })),
            },
        );
        assert!(manual.is_ok());

        let api = log_ingestion(
            &connection,
            &context.db_path,
            &IngestionLogEntry {
                organization_id: "org_test",
                client_id: "cli_acme",
                source_type: SourceType::SpApi,
                source_id: "sync_123",
                table_name: "daily_sales",
                operation: "upsert",
                record_count: 30,
                date_range_start: None,
                date_range_end: None,
                metadata: None,
            },
        );
        assert!(api.is_ok());

        let all = ingestion_log_for_client(&connection, &context.db_path, "cli_acme", None);
        assert!(all.is_ok());
        if let Ok(entries) = all {
            assert_eq!(entries.len(), 2);
        }

        let manual_only = ingestion_log_for_client(
            &connection,
            &context.db_path,
            "cli_acme",
            Some(SourceType::ManualUpload),
        );
        assert!(manual_only.is_ok());
        if let Ok(entries) = manual_only {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].source_id, "ses_one");
            assert_eq!(entries[0].date_range_end.as_deref(), Some("2025-01-31"));
        }

        let other_client =
            ingestion_log_for_client(&connection, &context.db_path, "cli_other", None);
        assert!(other_client.is_ok());
        if let Ok(entries) = other_client {
            assert!(entries.is_empty());
        }
    }
}
