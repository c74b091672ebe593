use crate::core::retry::{RetryCause, RetryPolicy};
use crate::domain::model::{MigrationPayload, SubmissionOutcome};
use crate::domain::ports::Submitter;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const RESPONSE_SNIPPET_CHARS: usize = 200;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoint: String,
    pub token: String,
    pub auth_scheme: String,
    pub timeout: Duration,
    pub insecure: bool,
    pub retry: RetryPolicy,
}

impl ClientSettings {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            auth_scheme: "Api-Token".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            insecure: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Fields echoed back by the server after a test case is created.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedTestCase {
    id: Option<serde_json::Value>,
    external_id: Option<String>,
}

impl CreatedTestCase {
    fn remote_id(&self) -> Option<String> {
        match &self.id {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

enum Attempt {
    Created(Option<CreatedTestCase>),
    Retry(RetryCause, String),
    Rejected { status: StatusCode, body: String },
}

/// HTTP submitter for the TestOps test case endpoint.
///
/// The inner `reqwest::Client` holds the connection pool; clones share it.
#[derive(Debug, Clone)]
pub struct TestOpsClient {
    client: Client,
    settings: ClientSettings,
}

impl TestOpsClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        if settings.insecure {
            tracing::warn!("⚠️ SSL certificate verification disabled!");
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.insecure)
            .build()?;

        Ok(Self { client, settings })
    }

    async fn attempt(&self, payload: &MigrationPayload) -> Attempt {
        let response = self
            .client
            .post(&self.settings.endpoint)
            .header(
                header::AUTHORIZATION,
                format!("{} {}", self.settings.auth_scheme, self.settings.token),
            )
            .json(payload)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Attempt::Retry(RetryCause::Transient, "request timed out".to_string())
            }
            Err(e) => return Attempt::Retry(RetryCause::Transient, e.to_string()),
        };

        let status = response.status();
        tracing::debug!("API response status: {}", status);

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                // 回應內容無法解析時仍視為成功，只是沒有遠端 ID
                let created = match response.json::<CreatedTestCase>().await {
                    Ok(created) => Some(created),
                    Err(e) => {
                        tracing::warn!("Could not parse create response: {}", e);
                        None
                    }
                };
                Attempt::Created(created)
            }
            StatusCode::TOO_MANY_REQUESTS => Attempt::Retry(
                RetryCause::RateLimited,
                "rate limited (HTTP 429)".to_string(),
            ),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Attempt::Rejected {
                    status,
                    body: body.chars().take(RESPONSE_SNIPPET_CHARS).collect(),
                }
            }
        }
    }
}

#[async_trait]
impl Submitter for TestOpsClient {
    async fn submit(&self, payload: &MigrationPayload) -> SubmissionOutcome {
        let policy = &self.settings.retry;
        let test_name = payload.name().unwrap_or("Unknown");
        tracing::debug!("Migrating '{}' to {}", test_name, self.settings.endpoint);

        for attempt in 0..policy.max_attempts {
            match self.attempt(payload).await {
                Attempt::Created(created) => {
                    let (remote_id, external_id) = match created {
                        Some(created) => (created.remote_id(), created.external_id),
                        None => (None, None),
                    };
                    return SubmissionOutcome::Success {
                        remote_id,
                        external_id: external_id
                            .or_else(|| payload.external_id().map(str::to_string)),
                    };
                }
                Attempt::Rejected { status, body } => {
                    return SubmissionOutcome::Failure {
                        reason: status
                            .canonical_reason()
                            .unwrap_or("Unknown Status")
                            .to_string(),
                        http_status: Some(status.as_u16()),
                        detail: (!body.is_empty()).then_some(body),
                    };
                }
                Attempt::Retry(cause, message) => {
                    if policy.is_last(attempt) {
                        tracing::warn!(
                            "{} for '{}' on attempt {}/{}, giving up",
                            message,
                            test_name,
                            attempt + 1,
                            policy.max_attempts
                        );
                        break;
                    }
                    let wait = policy.wait_for(cause, attempt);
                    tracing::warn!(
                        cause = cause.as_str(),
                        "{} for '{}' on attempt {}/{}, retrying in {:?}",
                        message,
                        test_name,
                        attempt + 1,
                        policy.max_attempts,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        tracing::error!(
            "Failed to migrate '{}' after {} attempts",
            test_name,
            policy.max_attempts
        );
        SubmissionOutcome::failure("retry budget exhausted")
    }
}
