use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct IngestError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl IngestError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn unknown_report_type(report_type: &str) -> Self {
        Self::new(
            "unknown_report_type",
            &format!("Report type `{report_type}` is not recognized."),
            vec![
                "Use one of the identifiers from the report-type catalog.".to_string(),
                "Check the upload form's report-type selection.".to_string(),
            ],
        )
        .with_data(json!({ "report_type": report_type }))
    }

    pub fn client_not_found(client_id: &str) -> Self {
        Self::new(
            "client_not_found",
            &format!("Client `{client_id}` was not found in your organization."),
            vec![
                "Verify the client id against the client list.".to_string(),
                "Clients belong to one organization; check you are uploading under the right one."
                    .to_string(),
            ],
        )
        .with_data(json!({ "client_id": client_id }))
    }

    pub fn session_not_found(session_id: &str) -> Self {
        Self::new(
            "session_not_found",
            &format!("Upload session `{session_id}` was not found."),
            vec!["List upload history to find a valid session id.".to_string()],
        )
        .with_data(json!({ "session_id": session_id }))
    }

    pub fn store_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_locked",
            &format!("Report store database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn store_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_corrupt",
            &format!("Report store database appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite store file or restore from backup."
            )],
        )
    }

    pub fn store_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_permission_denied",
            &format!("Cannot initialize report store at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `SELLERDECK_HOME` to a writable directory."
            )],
        )
    }

    pub fn store_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_failed",
            &format!("Report store initialization failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Report store migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
