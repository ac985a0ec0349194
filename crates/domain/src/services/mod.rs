//! Domain services for the Loyalty Relay.
//!
//! The record pipeline (fetch, filter, enrich, export) plus the
//! retirement workflow and the bulk-mail seam.

pub mod enrich;
pub mod export;
pub mod filter;
pub mod mailer;
pub mod record_store;
pub mod retirement;

pub use enrich::JoinSpec;
pub use export::{ColumnSpec, Table, TRANSACTION_COLUMNS, USER_COLUMNS};
pub use filter::{filter_records, Criteria, FilterOutcome};
pub use mailer::{EmailBatch, MailError, Mailer, MockMailer, SendReport};
pub use record_store::{CollectionRef, InMemoryRecordStore, RecordStore, StoreError};
pub use retirement::{RetireOutcome, RetirementPolicy, SweepReport, UpdateAccounting};
