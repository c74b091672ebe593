use crate::config::mapping::FieldMapping;
use crate::core::client::ClientSettings;
use crate::core::retry::RetryPolicy;
use crate::core::ConfigProvider;
use crate::utils::error::{MigrationError, Result};
use crate::utils::validation::{
    validate_endpoint_url, validate_positive_number, validate_range, Validate,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;

const TESTCASE_API_PATH: &str = "/api/rs/testcase";

#[derive(Clone, Parser)]
#[command(name = "testcase-migrate")]
#[command(about = "Migrate test cases from a CSV file to Allure TestOps")]
pub struct CliConfig {
    /// Path to the CSV file
    #[arg(short = 'f', long, env = "CSV_FILE_PATH", default_value = "sample_testcases.csv")]
    pub csv_file: PathBuf,

    /// Target project ID
    #[arg(short = 'p', long, env = "ALLURE_PROJECT_ID", default_value = "135")]
    pub project_id: u64,

    /// Base URL of the TestOps instance, used when --api-endpoint is not given
    #[arg(long, env = "ALLURE_BASE_URL")]
    pub base_url: Option<String>,

    /// Full URL of the test case endpoint
    #[arg(short = 'e', long, env = "ALLURE_API_ENDPOINT")]
    pub api_endpoint: Option<String>,

    /// API token (required unless --dry-run)
    #[arg(short = 't', long, env = "ALLURE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Scheme written before the token in the Authorization header
    #[arg(long, default_value = "Api-Token")]
    pub auth_scheme: String,

    /// Transform rows without submitting them
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Maximum number of submissions in flight
    #[arg(short = 'b', long, alias = "concurrency", default_value = "10")]
    pub batch_size: usize,

    /// Disable TLS certificate verification
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// TOML file overriding the column mapping and step separators
    #[arg(long)]
    pub mapping: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Attempts per record, including the first one
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("csv_file", &self.csv_file)
            .field("project_id", &self.project_id)
            .field("api_endpoint", &self.api_endpoint())
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("dry_run", &self.dry_run)
            .field("batch_size", &self.batch_size)
            .field("insecure", &self.insecure)
            .field("mapping", &self.mapping)
            .finish()
    }
}

impl CliConfig {
    /// 優先使用 --api-endpoint，否則由 base URL 組出
    pub fn api_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = &self.api_endpoint {
            return Some(endpoint.clone());
        }
        self.base_url
            .as_ref()
            .map(|base| format!("{}{}", base.trim_end_matches('/'), TESTCASE_API_PATH))
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    pub fn field_mapping(&self) -> Result<FieldMapping> {
        match &self.mapping {
            Some(path) => FieldMapping::from_file(path),
            None => Ok(FieldMapping::default()),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    /// Settings for the HTTP client; `None` when no token is configured.
    pub fn client_settings(&self) -> Result<Option<ClientSettings>> {
        let Some(token) = self.api_token() else {
            return Ok(None);
        };
        let endpoint = self.api_endpoint().ok_or_else(|| MigrationError::ConfigError {
            message: "either --api-endpoint or --base-url must be set".to_string(),
        })?;

        Ok(Some(ClientSettings {
            endpoint,
            token: token.to_string(),
            auth_scheme: self.auth_scheme.clone(),
            timeout: Duration::from_secs(self.timeout),
            insecure: self.insecure,
            retry: self.retry_policy(),
        }))
    }
}

impl ConfigProvider for CliConfig {
    fn csv_file(&self) -> &Path {
        &self.csv_file
    }

    fn project_id(&self) -> u64 {
        self.project_id
    }

    fn concurrency(&self) -> usize {
        self.batch_size
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }

    fn verbose(&self) -> bool {
        self.verbose
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("batch_size", self.batch_size, 1)?;
        validate_range("max_retries", self.max_retries, 1, 10)?;
        validate_range("timeout", self.timeout, 1, 600)?;

        if self.dry_run {
            return Ok(());
        }

        if self.api_token().is_none() {
            return Err(MigrationError::MissingCredential);
        }

        match self.api_endpoint() {
            Some(endpoint) => validate_endpoint_url("api_endpoint", &endpoint),
            None => Err(MigrationError::ConfigError {
                message: "either --api-endpoint or --base-url must be set".to_string(),
            }),
        }
    }
}
