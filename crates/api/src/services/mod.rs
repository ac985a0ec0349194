//! Outbound clients and file delivery.

pub mod export_file;
pub mod mailer;
pub mod record_api;

pub use export_file::ExportFile;
pub use mailer::EmailApiClient;
pub use record_api::RecordApiClient;
