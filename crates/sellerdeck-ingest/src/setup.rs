use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::migrations::run_pending;
use crate::state::{
    ensure_data_directory, map_sqlite_error, open_connection, reports_db_path, resolve_data_home,
};
use crate::{IngestError, IngestResult};

/// Resolved store configuration handed to every entry point. Nothing in the
/// crate reads environment state after this is constructed.
#[derive(Debug, Clone)]
pub struct SetupContext {
    pub data_home: PathBuf,
    pub db_path: PathBuf,
}

pub fn ensure_initialized() -> IngestResult<SetupContext> {
    ensure_initialized_with_home_override(None)
}

pub fn ensure_initialized_at(home_override: &Path) -> IngestResult<SetupContext> {
    ensure_initialized_with_home_override(Some(home_override))
}

fn ensure_initialized_with_home_override(
    home_override: Option<&Path>,
) -> IngestResult<SetupContext> {
    let data_home = resolve_data_home(home_override)?;
    ensure_data_directory(&data_home)?;

    let db_path = reports_db_path(&data_home);
    let mut connection = open_connection(&db_path)?;
    run_pending(&mut connection).map_err(|error| map_migration_error(&db_path, &error))?;

    Ok(SetupContext { data_home, db_path })
}

pub fn open_store(context: &SetupContext) -> IngestResult<Connection> {
    open_connection(&context.db_path)
}

fn map_migration_error(db_path: &Path, error: &rusqlite_migration::Error) -> IngestError {
    match error {
        rusqlite_migration::Error::RusqliteError { query: _, err } => {
            let mapped = map_sqlite_error(db_path, err);
            if mapped.code == "store_locked"
                || mapped.code == "store_corrupt"
                || mapped.code == "store_init_permission_denied"
            {
                mapped
            } else {
                IngestError::migration_failed(db_path, &error.to_string())
            }
        }
        _ => IngestError::migration_failed(db_path, &error.to_string()),
    }
}
