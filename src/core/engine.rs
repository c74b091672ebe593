use crate::config::mapping::FieldMapping;
use crate::core::reader::CsvReader;
use crate::core::transformer::TestCaseTransformer;
use crate::core::{ConfigProvider, RowSource, Submitter};
use crate::domain::model::{MigrationPayload, MigrationSummary, SubmissionOutcome};
use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::validate_positive_number;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Validating,
    Streaming,
    Draining,
    Summarizing,
    Done,
}

fn advance(phase: &mut RunPhase, next: RunPhase) {
    tracing::debug!("Migration phase {:?} -> {:?}", phase, next);
    *phase = next;
}

type Resolved = (String, SubmissionOutcome);

/// Drives one migration run: read, transform, submit, summarize.
pub struct MigrationEngine<C: ConfigProvider, S: Submitter + 'static, R: RowSource = CsvReader> {
    config: C,
    source: R,
    transformer: TestCaseTransformer,
    submitter: Option<Arc<S>>,
}

impl<C: ConfigProvider, S: Submitter + 'static> MigrationEngine<C, S> {
    /// Reads rows from the CSV file named by `config`.
    pub fn new(config: C, mapping: FieldMapping, submitter: Option<S>) -> Result<Self> {
        let source = CsvReader::new(config.csv_file());
        Self::with_source(config, source, mapping, submitter)
    }
}

impl<C: ConfigProvider, S: Submitter + 'static, R: RowSource> MigrationEngine<C, S, R> {
    /// `submitter` may be `None` only for dry runs. Payloads carry
    /// `config.project_id()`.
    pub fn with_source(
        config: C,
        source: R,
        mapping: FieldMapping,
        submitter: Option<S>,
    ) -> Result<Self> {
        let transformer = TestCaseTransformer::new(config.project_id(), mapping)?;
        Ok(Self {
            config,
            source,
            transformer,
            submitter: submitter.map(Arc::new),
        })
    }

    /// Runs the whole migration.
    ///
    /// Setup problems fail before any row is read. Per-row problems are
    /// counted as failures. If the row stream breaks mid-run, submissions
    /// already in flight are drained and counted, the summary is logged, and
    /// the read error is returned.
    pub async fn run(&self) -> Result<MigrationSummary> {
        let (summary, aborted) = self.migrate().await?;
        match aborted {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Setup errors come back as `Err`; a stream failure after setup comes
    /// back next to the summary of everything that did run.
    async fn migrate(&self) -> Result<(MigrationSummary, Option<MigrationError>)> {
        let mut phase = RunPhase::Idle;

        advance(&mut phase, RunPhase::Validating);
        self.source.validate()?;
        validate_positive_number("concurrency", self.config.concurrency(), 1)?;
        let submitter = if self.config.dry_run() {
            None
        } else {
            Some(
                self.submitter
                    .clone()
                    .ok_or(MigrationError::MissingCredential)?,
            )
        };

        let total_rows = self.source.count_rows();
        tracing::info!(
            "🚀 Starting migration for Project ID: {}",
            self.config.project_id()
        );
        tracing::info!(
            "📂 Found {} test cases in {}",
            total_rows,
            self.source.location()
        );
        if submitter.is_none() {
            tracing::info!("🔍 DRY RUN MODE - payloads will not be submitted");
        }

        let rows = self.source.read_rows()?;
        let mut summary = MigrationSummary::start();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let mut in_flight: JoinSet<Resolved> = JoinSet::new();
        let mut aborted = None;

        advance(&mut phase, RunPhase::Streaming);
        for item in rows {
            let record = match item {
                Ok(record) => record,
                Err(e) if e.is_fatal() => {
                    tracing::error!("❌ {}", e.user_friendly_message());
                    aborted = Some(e);
                    break;
                }
                Err(e) => {
                    tracing::error!("❌ {}", e.user_friendly_message());
                    summary.record(&SubmissionOutcome::failure(e.to_string()));
                    continue;
                }
            };

            let span = tracing::info_span!("record", line = record.line);
            let payload = match span.in_scope(|| self.transformer.transform(&record)) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("❌ Error processing row {}: {}", record.line, e);
                    summary.record(&SubmissionOutcome::failure(e.to_string()));
                    continue;
                }
            };
            let label = payload.label(record.line);
            span.in_scope(|| self.report_payload(&label, &payload));

            let Some(submitter) = &submitter else {
                tracing::info!("[DRY RUN] Would migrate: {}", label);
                summary.record(&SubmissionOutcome::Success {
                    remote_id: None,
                    external_id: payload.external_id().map(str::to_string),
                });
                continue;
            };

            let permit = loop {
                tokio::select! {
                    permit = semaphore.clone().acquire_owned() => break permit,
                    Some(joined) = in_flight.join_next() => {
                        self.collect(joined, &mut summary, total_rows);
                    }
                }
            };
            let permit: OwnedSemaphorePermit = match permit {
                Ok(permit) => permit,
                Err(e) => {
                    aborted = Some(MigrationError::ConfigError {
                        message: format!("submission pool closed: {}", e),
                    });
                    break;
                }
            };

            let submitter = Arc::clone(submitter);
            in_flight.spawn(
                async move {
                    let _permit = permit;
                    let outcome = submitter.submit(&payload).await;
                    (label, outcome)
                }
                .instrument(span),
            );
        }

        advance(&mut phase, RunPhase::Draining);
        while let Some(joined) = in_flight.join_next().await {
            self.collect(joined, &mut summary, total_rows);
        }

        advance(&mut phase, RunPhase::Summarizing);
        summary.finish();
        log_summary(&summary);

        advance(&mut phase, RunPhase::Done);
        Ok((summary, aborted))
    }

    fn report_payload(&self, label: &str, payload: &MigrationPayload) {
        let rendered = match serde_json::to_string_pretty(payload) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!("Could not render payload for '{}': {}", label, e);
                return;
            }
        };

        if self.config.dry_run() && self.config.verbose() {
            tracing::info!("--- PREPARING MIGRATION: {} ---", label);
            tracing::info!("Payload structure:\n{}", rendered);
        } else {
            tracing::debug!("Payload for '{}':\n{}", label, rendered);
        }
    }

    // 唯一的計數點：所有結果都在 orchestrator 任務上彙總
    fn collect(
        &self,
        joined: std::result::Result<Resolved, JoinError>,
        summary: &mut MigrationSummary,
        total_rows: usize,
    ) {
        let (label, outcome) = match joined {
            Ok(resolved) => resolved,
            Err(e) => {
                let outcome = SubmissionOutcome::failure(format!("submission task failed: {}", e));
                summary.record(&outcome);
                tracing::error!("❌ FAILURE: submission task did not complete: {}", e);
                return;
            }
        };
        summary.record(&outcome);
        let progress = format!("[{}/{}]", summary.total(), total_rows);

        match &outcome {
            SubmissionOutcome::Success {
                remote_id,
                external_id,
            } => tracing::info!(
                "✅ {} SUCCESS: '{}' migrated. ID: {}, External ID: {}",
                progress,
                label,
                remote_id.as_deref().unwrap_or("-"),
                external_id.as_deref().unwrap_or("-")
            ),
            SubmissionOutcome::Failure {
                reason,
                http_status,
                detail,
            } => tracing::error!(
                "❌ {} FAILURE: '{}' - {}{}{}",
                progress,
                label,
                reason,
                http_status
                    .map(|status| format!(" (status {})", status))
                    .unwrap_or_default(),
                detail
                    .as_deref()
                    .map(|body| format!(", response: {}", body))
                    .unwrap_or_default()
            ),
        }
    }
}

pub fn log_summary(summary: &MigrationSummary) {
    let rule = "=".repeat(50);
    tracing::info!("{}", rule);
    tracing::info!("Migration Summary");
    tracing::info!("{}", rule);
    tracing::info!("Total processed: {}", summary.total());
    tracing::info!("Successfully migrated: {}", summary.succeeded);
    if summary.failed > 0 {
        tracing::info!("Failed migrations: {}", summary.failed);
    }
    tracing::info!("Success rate: {:.1}%", summary.success_rate());
    if let Some(finished_at) = summary.finished_at {
        let elapsed = finished_at - summary.started_at;
        tracing::info!("Elapsed: {:.3}s", elapsed.num_milliseconds() as f64 / 1000.0);
    }
    tracing::info!("{}", rule);
}
