pub mod client;
pub mod engine;
pub mod reader;
pub mod retry;
pub mod transformer;

pub use crate::domain::model::{MigrationPayload, SourceRecord, SubmissionOutcome};
pub use crate::domain::ports::{ConfigProvider, RowSource, Submitter};
pub use crate::utils::error::Result;
