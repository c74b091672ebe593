use crate::utils::error::{MigrationError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Checks the TestOps test case endpoint that payloads are POSTed to.
pub fn validate_endpoint_url(field_name: &str, endpoint: &str) -> Result<()> {
    let invalid = |reason: String| MigrationError::InvalidConfigValue {
        field: field_name.to_string(),
        value: endpoint.to_string(),
        reason,
    };

    if endpoint.trim().is_empty() {
        return Err(invalid(
            "TestOps endpoint is empty; set --api-endpoint or --base-url".to_string(),
        ));
    }

    let url = Url::parse(endpoint).map_err(|e| {
        invalid(format!(
            "TestOps endpoint is not an absolute URL ({}), expected e.g. https://testops.example.com/api/rs/testcase",
            e
        ))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(invalid(format!(
            "TestOps endpoint must be reached over http or https, not '{}'",
            scheme
        ))),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(MigrationError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MigrationError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(MigrationError::InvalidConfigValue {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}
