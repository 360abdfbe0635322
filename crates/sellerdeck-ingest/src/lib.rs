pub mod clients;
pub mod coerce;
pub mod columns;
pub mod error;
pub mod ingest;
pub mod migrations;
pub mod parsers;
pub mod registry;
pub mod session;
pub mod setup;
pub mod state;

pub use error::{IngestError, IngestResult};
pub use ingest::{UploadOutcome, UploadRequest};
pub use registry::ReportType;
pub use setup::SetupContext;
