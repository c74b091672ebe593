use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("CSV file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Path is not a file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("API token is required unless running in dry-run mode")]
    MissingCredential,

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field mapping error: {message}")]
    MappingError { message: String },

    #[error("Failed to read CSV stream: {message}")]
    ReadError { message: String },

    #[error("Malformed row {line}: {message}")]
    MalformedRow { line: u64, message: String },

    #[error("Transform error for row {line}: {message}")]
    TransformError { line: u64, message: String },

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 在處理任何資料列之前發生，整個執行中止
    Setup,
    /// 單筆記錄的錯誤，計入失敗後繼續
    Record,
    /// 來源串流中斷
    Source,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl MigrationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. }
            | Self::NotAFile { .. }
            | Self::MissingCredential
            | Self::ConfigError { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MappingError { .. }
            | Self::TomlError(_) => ErrorCategory::Setup,
            Self::MalformedRow { .. } | Self::TransformError { .. } => ErrorCategory::Record,
            Self::ReadError { .. } | Self::CsvError(_) | Self::IoError(_) => ErrorCategory::Source,
            Self::HttpError(_) | Self::SerializationError(_) => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Record => ErrorSeverity::Medium,
            ErrorCategory::Setup => ErrorSeverity::High,
            ErrorCategory::Source => ErrorSeverity::High,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// Setup and source errors abort the run; record errors are counted and skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Record)
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "Check the --csv-file path or the CSV_FILE_PATH variable",
            Self::NotAFile { .. } => "Point --csv-file at a CSV file, not a directory",
            Self::MissingCredential => {
                "Set ALLURE_API_TOKEN, pass --api-token, or use --dry-run to preview"
            }
            Self::ConfigError { .. } | Self::InvalidConfigValue { .. } => {
                "Review the command line flags and environment variables"
            }
            Self::MappingError { .. } | Self::TomlError(_) => {
                "Fix the field mapping file passed with --mapping"
            }
            Self::ReadError { .. } | Self::CsvError(_) | Self::IoError(_) => {
                "Make sure the CSV file stays readable for the whole run"
            }
            Self::MalformedRow { .. } => "Re-save the CSV file as UTF-8",
            Self::TransformError { .. } => "Check the row contents against the field mapping",
            Self::HttpError(_) => "Check TLS settings (--insecure) and network access",
            Self::SerializationError(_) => "This is a bug, please report it",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Setup => format!("Setup failed: {}", self),
            ErrorCategory::Record => format!("Record skipped: {}", self),
            ErrorCategory::Source => format!("Migration aborted: {}", self),
            ErrorCategory::Internal => format!("Unexpected error: {}", self),
        }
    }
}
