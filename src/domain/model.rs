use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 一列非空白的 CSV 資料，欄位順序與標頭相同。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    /// 1-based data line (header excluded)
    pub line: u64,
    pub fields: IndexMap<String, String>,
}

impl SourceRecord {
    pub fn new(line: u64, fields: IndexMap<String, String>) -> Self {
        Self { line, fields }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    pub expected_result: String,
}

impl Step {
    pub fn action(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected_result: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

/// The request body for one test case.
///
/// Blank source values never become keys: pass-through fields are only
/// inserted when non-blank and every structured field is skipped while empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPayload {
    pub project_id: u64,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
}

impl MigrationPayload {
    /// Keys owned by the structured fields; pass-through entries must not reuse them.
    pub const RESERVED_KEYS: &'static [&'static str] = &[
        "projectId",
        "priority",
        "tags",
        "description",
        "steps",
        "scenario",
    ];

    pub fn new(project_id: u64) -> Self {
        Self {
            project_id,
            fields: BTreeMap::new(),
            priority: None,
            tags: Vec::new(),
            description: String::new(),
            steps: Vec::new(),
            scenario: None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").map(String::as_str)
    }

    pub fn external_id(&self) -> Option<&str> {
        self.fields.get("externalId").map(String::as_str)
    }

    /// 用於日誌的顯示名稱
    pub fn label(&self, line: u64) -> String {
        self.name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("TestCase_{}", line))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Success {
        remote_id: Option<String>,
        external_id: Option<String>,
    },
    Failure {
        reason: String,
        http_status: Option<u16>,
        /// Truncated response body, when the server sent one.
        detail: Option<String>,
    },
}

impl SubmissionOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            http_status: None,
            detail: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl MigrationSummary {
    pub fn start() -> Self {
        Self {
            succeeded: 0,
            failed: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, outcome: &SubmissionOutcome) {
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Percentage of succeeded records; 0 when nothing was processed.
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.succeeded as f64 / total as f64 * 100.0
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "processed={} succeeded={} failed={} success_rate={:.1}%",
            self.total(),
            self.succeeded,
            self.failed,
            self.success_rate()
        )
    }
}
