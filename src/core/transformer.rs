use crate::config::mapping::{FieldMapping, TargetField};
use crate::domain::model::{MigrationPayload, Scenario, SourceRecord, Step, Tag};
use crate::utils::error::{MigrationError, Result};
use regex::Regex;
use std::sync::LazyLock;

static TAG_SPLITTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[,;]").expect("valid tag separator regex"));

/// Turns CSV rows into TestOps payloads according to a [`FieldMapping`].
#[derive(Debug, Clone)]
pub struct TestCaseTransformer {
    project_id: u64,
    mapping: FieldMapping,
    step_splitter: Regex,
}

impl TestCaseTransformer {
    pub fn new(project_id: u64, mapping: FieldMapping) -> Result<Self> {
        let pattern = format!("{}|\n", regex::escape(&mapping.step_separator));
        let step_splitter = Regex::new(&pattern).map_err(|e| MigrationError::MappingError {
            message: format!("unusable step separator '{}': {}", mapping.step_separator, e),
        })?;

        Ok(Self {
            project_id,
            mapping,
            step_splitter,
        })
    }

    /// Splits a steps cell into ordered step objects.
    ///
    /// Step boundaries are the step separator and raw newlines. Each segment
    /// is split on the first action/expected separator; a segment without
    /// one becomes an action with an empty expected result.
    pub fn parse_steps(&self, steps_str: &str) -> Vec<Step> {
        if steps_str.trim().is_empty() {
            return Vec::new();
        }

        let separator = self.mapping.expected_separator.as_str();
        self.step_splitter
            .split(steps_str)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once(separator) {
                Some((action, expected)) if !action.trim().is_empty() => Step {
                    name: action.trim().to_string(),
                    expected_result: expected.trim().to_string(),
                },
                Some(_) => {
                    tracing::warn!("Could not parse step: {}", segment);
                    Step::action(segment)
                }
                None => Step::action(segment),
            })
            .collect()
    }

    pub fn parse_tags(&self, tags_str: &str) -> Vec<Tag> {
        TAG_SPLITTER
            .split(tags_str)
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(|tag| Tag {
                name: tag.to_string(),
            })
            .collect()
    }

    pub fn transform(&self, record: &SourceRecord) -> Result<MigrationPayload> {
        let mut payload = MigrationPayload::new(self.project_id);

        for entry in &self.mapping.fields {
            let value = match record.get(&entry.column).map(str::trim) {
                Some(value) if !value.is_empty() => value,
                _ => continue,
            };

            match &entry.target {
                TargetField::PassThrough(key) => {
                    if MigrationPayload::RESERVED_KEYS.contains(&key.as_str()) {
                        return Err(MigrationError::TransformError {
                            line: record.line,
                            message: format!(
                                "column '{}' targets reserved key '{}'",
                                entry.column, key
                            ),
                        });
                    }
                    payload.fields.insert(key.clone(), value.to_string());
                }
                TargetField::Preconditions => {
                    payload
                        .description
                        .push_str(&format!("Preconditions:\n{}\n\n", value));
                }
                TargetField::Steps => {
                    let steps = self.parse_steps(value);
                    if !steps.is_empty() {
                        payload.scenario = Some(Scenario {
                            steps: steps.clone(),
                        });
                    }
                    payload.steps = steps;
                }
                TargetField::Tags => {
                    payload.tags = self.parse_tags(value);
                }
                TargetField::Priority => {
                    payload.priority = Some(value.to_uppercase());
                }
            }
        }

        Ok(payload)
    }
}
