pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::mapping::{FieldMapping, MappingEntry, TargetField};
pub use crate::core::{
    client::{ClientSettings, TestOpsClient},
    engine::MigrationEngine,
    reader::CsvReader,
    retry::{RetryCause, RetryPolicy},
    transformer::TestCaseTransformer,
};
pub use domain::model::{MigrationPayload, MigrationSummary, SourceRecord, SubmissionOutcome};
pub use utils::error::{MigrationError, Result};
