use crate::domain::model::MigrationPayload;
use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_STEP_SEPARATOR: &str = " | ";
pub const DEFAULT_EXPECTED_SEPARATOR: &str = "; Expected: ";

/// 目標欄位：單純改名，或需要特殊轉換的欄位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    PassThrough(String),
    Preconditions,
    Steps,
    Tags,
    Priority,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub column: String,
    pub target: TargetField,
}

impl MappingEntry {
    pub fn new(column: &str, target: TargetField) -> Self {
        Self {
            column: column.to_string(),
            target,
        }
    }
}

/// CSV column → payload concept table, plus the step delimiters.
///
/// ```toml
/// step_separator = " | "
/// expected_separator = "; Expected: "
///
/// [[fields]]
/// column = "ID"
/// target = { pass_through = "externalId" }
///
/// [[fields]]
/// column = "Steps"
/// target = "steps"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default = "default_step_separator")]
    pub step_separator: String,
    #[serde(default = "default_expected_separator")]
    pub expected_separator: String,
    pub fields: Vec<MappingEntry>,
}

fn default_step_separator() -> String {
    DEFAULT_STEP_SEPARATOR.to_string()
}

fn default_expected_separator() -> String {
    DEFAULT_EXPECTED_SEPARATOR.to_string()
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            step_separator: default_step_separator(),
            expected_separator: default_expected_separator(),
            fields: vec![
                MappingEntry::new("ID", TargetField::PassThrough("externalId".to_string())),
                MappingEntry::new("Title", TargetField::PassThrough("name".to_string())),
                MappingEntry::new("Priority", TargetField::Priority),
                MappingEntry::new("Tags", TargetField::Tags),
                MappingEntry::new("Preconditions", TargetField::Preconditions),
                MappingEntry::new("Steps", TargetField::Steps),
            ],
        }
    }
}

impl FieldMapping {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mapping: FieldMapping = toml::from_str(content)?;
        mapping.validate()?;
        Ok(mapping)
    }
}

impl Validate for FieldMapping {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("step_separator", &self.step_separator)?;
        validate_non_empty_string("expected_separator", &self.expected_separator)?;

        if self.fields.is_empty() {
            return Err(MigrationError::MappingError {
                message: "mapping defines no fields".to_string(),
            });
        }

        let mut seen_keys = HashSet::new();
        for entry in &self.fields {
            if entry.column.trim().is_empty() {
                return Err(MigrationError::MappingError {
                    message: "mapping entry has an empty column name".to_string(),
                });
            }

            if let TargetField::PassThrough(key) = &entry.target {
                if key.trim().is_empty() {
                    return Err(MigrationError::MappingError {
                        message: format!("column '{}' maps to an empty key", entry.column),
                    });
                }
                if MigrationPayload::RESERVED_KEYS.contains(&key.as_str()) {
                    return Err(MigrationError::MappingError {
                        message: format!(
                            "column '{}' cannot pass through to reserved key '{}'",
                            entry.column, key
                        ),
                    });
                }
                if !seen_keys.insert(key.as_str()) {
                    return Err(MigrationError::MappingError {
                        message: format!("key '{}' is mapped more than once", key),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_mapping_is_valid() {
        let mapping = FieldMapping::default();
        assert!(mapping.validate().is_ok());
        assert_eq!(mapping.fields.len(), 6);
        assert_eq!(mapping.step_separator, " | ");
        assert_eq!(mapping.expected_separator, "; Expected: ");
    }

    #[test]
    fn test_parse_toml_mapping() {
        let toml_content = r#"
step_separator = " >> "

[[fields]]
column = "Key"
target = { pass_through = "externalId" }

[[fields]]
column = "Summary"
target = { pass_through = "name" }

[[fields]]
column = "Setup"
target = "preconditions"

[[fields]]
column = "Given"
target = "preconditions"

[[fields]]
column = "Labels"
target = "tags"
"#;

        let mapping = FieldMapping::from_toml_str(toml_content).unwrap();

        assert_eq!(mapping.step_separator, " >> ");
        assert_eq!(mapping.expected_separator, DEFAULT_EXPECTED_SEPARATOR);
        assert_eq!(mapping.fields.len(), 5);
        assert_eq!(
            mapping.fields[0].target,
            TargetField::PassThrough("externalId".to_string())
        );
        assert_eq!(mapping.fields[3].target, TargetField::Preconditions);
    }

    #[test]
    fn test_reserved_pass_through_key_is_rejected() {
        let toml_content = r#"
[[fields]]
column = "Severity"
target = { pass_through = "priority" }
"#;

        let err = FieldMapping::from_toml_str(toml_content).unwrap_err();
        assert!(matches!(err, MigrationError::MappingError { .. }));
    }

    #[test]
    fn test_duplicate_pass_through_key_is_rejected() {
        let mut mapping = FieldMapping::default();
        mapping
            .fields
            .push(MappingEntry::new("Name", TargetField::PassThrough("name".to_string())));
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn test_unknown_target_fails_to_parse() {
        let toml_content = r#"
[[fields]]
column = "X"
target = "attachments"
"#;

        let err = FieldMapping::from_toml_str(toml_content).unwrap_err();
        assert!(matches!(err, MigrationError::TomlError(_)));
    }

    #[test]
    fn test_mapping_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[[fields]]\ncolumn = \"Title\"\ntarget = { pass_through = \"name\" }\n")
            .unwrap();

        let mapping = FieldMapping::from_file(temp_file.path()).unwrap();
        assert_eq!(mapping.fields.len(), 1);
    }
}
