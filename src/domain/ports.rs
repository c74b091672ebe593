use crate::domain::model::{MigrationPayload, SourceRecord, SubmissionOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

pub trait ConfigProvider: Send + Sync {
    fn csv_file(&self) -> &Path;
    fn project_id(&self) -> u64;
    fn concurrency(&self) -> usize;
    fn dry_run(&self) -> bool;
    fn verbose(&self) -> bool;
}

/// A re-readable stream of source rows.
///
/// Each call to `read_rows` starts a fresh pass. Items that are
/// `Err` with a fatal error end the stream; the other errors belong to a
/// single row.
pub trait RowSource: Send + Sync {
    type Rows: Iterator<Item = Result<SourceRecord>> + Send;

    /// Where the rows come from, for log lines.
    fn location(&self) -> String;
    fn validate(&self) -> Result<()>;
    /// Advisory row count for progress display; 0 when unknown.
    fn count_rows(&self) -> usize;
    fn read_rows(&self) -> Result<Self::Rows>;
}

/// Delivers one payload to the remote service.
///
/// Implementations own their retry policy and never return an error: every
/// cause of failure is folded into [`SubmissionOutcome::Failure`].
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, payload: &MigrationPayload) -> SubmissionOutcome;
}
