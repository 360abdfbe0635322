use std::fs;
use std::path::Path;

use rusqlite::Connection;
use sellerdeck_ingest::migrations::REPORT_STORE_TABLES;
use sellerdeck_ingest::setup::ensure_initialized_at;
use sellerdeck_ingest::state::map_io_error;
use tempfile::tempdir;

fn object_exists(connection: &Connection, object_type: &str, object_name: &str) -> bool {
    let query = "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2";
    let statement = connection.prepare(query);
    if statement.is_err() {
        return false;
    }

    if let Ok(mut stmt) = statement {
        let mut rows = stmt.query([object_type, object_name]);
        if rows.is_err() {
            return false;
        }

        if let Ok(ref mut row_cursor) = rows {
            let next_row = row_cursor.next();
            if let Ok(row) = next_row {
                return row.is_some();
            }
        }
    }

    false
}

fn object_has_column(connection: &Connection, table: &str, column_name: &str) -> bool {
    let sql = format!("PRAGMA table_info({table})");
    let statement = connection.prepare(&sql);
    if statement.is_err() {
        return false;
    }
    if let Ok(mut stmt) = statement {
        let rows = stmt.query_map([], |row| row.get::<_, String>(1));
        if rows.is_err() {
            return false;
        }
        if let Ok(iter) = rows {
            for maybe_name in iter {
                if let Ok(name) = maybe_name
                    && name == column_name
                {
                    return true;
                }
            }
        }
    }
    false
}

#[test]
fn setup_creates_reports_db_at_home_override() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("sellerdeck-home");

        let context = ensure_initialized_at(&home);
        assert!(context.is_ok());
        if let Ok(setup_context) = context {
            assert!(setup_context.db_path.ends_with("reports.db"));
            assert!(home.join("reports.db").exists());
        }
    }
}

#[test]
fn setup_is_idempotent_for_an_existing_store() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("sellerdeck-home");

        let first = ensure_initialized_at(&home);
        assert!(first.is_ok());
        let second = ensure_initialized_at(&home);
        assert!(second.is_ok());

        if let (Ok(first_context), Ok(second_context)) = (first, second) {
            assert_eq!(first_context.db_path, second_context.db_path);
        }
    }
}

#[test]
fn setup_creates_every_report_store_table_and_source_index() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("sellerdeck-home");

        let context = ensure_initialized_at(&home);
        assert!(context.is_ok());
        if let Ok(setup_context) = context {
            let connection = Connection::open(&setup_context.db_path);
            assert!(connection.is_ok());
            if let Ok(conn) = connection {
                for table in REPORT_STORE_TABLES {
                    assert!(object_exists(&conn, "table", table));
                    assert!(object_has_column(&conn, table, "data_source_type"));
                    assert!(object_has_column(&conn, table, "data_source_id"));
                    assert!(object_exists(&conn, "index", &format!("idx_{table}_source_id")));
                }

                assert!(object_exists(&conn, "table", "clients"));
                assert!(object_exists(&conn, "table", "upload_sessions"));
                assert!(object_exists(&conn, "table", "ingestion_log"));
                assert!(object_has_column(&conn, "upload_sessions", "records_inserted"));
                assert!(object_has_column(&conn, "upload_sessions", "error_message"));
                assert!(object_has_column(&conn, "ingestion_log", "date_range_start"));
            }
        }
    }
}

#[test]
fn setup_maps_corrupt_database_to_store_corrupt() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("sellerdeck-home");
        let create_home = fs::create_dir_all(&home);
        assert!(create_home.is_ok());

        let db_path = home.join("reports.db");
        let write_file = fs::write(&db_path, "not-a-sqlite-database");
        assert!(write_file.is_ok());

        let result = ensure_initialized_at(&home);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "store_corrupt");
        }
    }
}

#[test]
fn setup_maps_schema_conflict_to_migration_failed() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let home = temp_dir.path().join("sellerdeck-home");
        let create_home = fs::create_dir_all(&home);
        assert!(create_home.is_ok());

        let db_path = home.join("reports.db");
        let connection = Connection::open(&db_path);
        assert!(connection.is_ok());
        if let Ok(conn) = connection {
            let create_conflict = conn.execute_batch("CREATE TABLE daily_sales(id TEXT);");
            assert!(create_conflict.is_ok());
        }

        let result = ensure_initialized_at(&home);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "migration_failed");
        }
    }
}

#[test]
fn io_permission_denied_maps_to_store_init_permission_denied() {
    let io_error = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
    let mapped = map_io_error(Path::new("/tmp/sellerdeck-home"), &io_error);
    assert_eq!(mapped.code, "store_init_permission_denied");
}

#[test]
fn setup_maps_unexpected_path_error_to_store_init_failed() {
    let temp = tempdir();
    assert!(temp.is_ok());
    if let Ok(temp_dir) = temp {
        let file_as_home = temp_dir.path().join("not-a-dir");
        let write_file = fs::write(&file_as_home, "content");
        assert!(write_file.is_ok());

        let result = ensure_initialized_at(&file_as_home);
        assert!(result.is_err());
        if let Err(error) = result {
            assert_eq!(error.code, "store_init_failed");
        }
    }
}
