//! Minimal client records. Client management itself lives outside this
//! crate; ingestion only needs organization-scoped lookup and a display
//! name for the history view.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::IngestResult;
use crate::session::now_timestamp;
use crate::state::map_sqlite_error;

#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub client_id: String,
    pub organization_id: String,
    pub display_name: String,
}

/// Looks a client up inside the caller's organization. A client that exists
/// under another organization is treated the same as one that does not
/// exist at all.
pub fn find_client(
    connection: &Connection,
    db_path: &Path,
    client_id: &str,
    organization_id: &str,
) -> IngestResult<Option<Client>> {
    connection
        .query_row(
            "SELECT client_id, organization_id, display_name
             FROM clients
             WHERE client_id = ?1 AND organization_id = ?2
             LIMIT 1",
            params![client_id, organization_id],
            |row| {
                Ok(Client {
                    client_id: row.get(0)?,
                    organization_id: row.get(1)?,
                    display_name: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))
}

pub fn create_client(
    connection: &Connection,
    db_path: &Path,
    client_id: &str,
    organization_id: &str,
    display_name: &str,
) -> IngestResult<()> {
    connection
        .execute(
            "INSERT INTO clients (client_id, organization_id, display_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![client_id, organization_id, display_name, now_timestamp()],
        )
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(())
}
