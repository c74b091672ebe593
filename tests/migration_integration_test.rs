use clap::Parser;
use httpmock::prelude::*;
use std::io::Write;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use testcase_migrate::core::client::ClientSettings;
use testcase_migrate::utils::validation::Validate;
use testcase_migrate::{
    CliConfig, FieldMapping, MigrationEngine, MigrationError, RetryPolicy, TestOpsClient,
};

const SAMPLE_CSV: &str = "\
ID,Title,Priority,Tags,Preconditions,Steps
TC-01,Test Login,High,\"smoke, auth\",User exists,Login; Expected: Success
,,,,,
TC-02,Broken case,low,,,Open page | Click save; Expected: Saved
TC-03,Logout,,regression,,\"Open menu
Click logout; Expected: Login page shown\"
";

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn cli(args: &[&str]) -> CliConfig {
    let mut argv = vec!["testcase-migrate"];
    argv.extend_from_slice(args);
    CliConfig::try_parse_from(argv).unwrap()
}

fn fast_client(endpoint: String) -> TestOpsClient {
    let mut settings = ClientSettings::new(endpoint, "secret");
    settings.timeout = Duration::from_secs(5);
    settings.retry = RetryPolicy {
        max_attempts: 2,
        rate_limit_base: Duration::from_millis(10),
        transient_pause: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
    };
    TestOpsClient::new(settings).unwrap()
}

#[tokio::test]
async fn test_end_to_end_migration_with_partial_failure() {
    let file = csv_file(SAMPLE_CSV);
    let server = MockServer::start();

    let login_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/rs/testcase")
            .header("Authorization", "Api-Token secret")
            .json_body(serde_json::json!({
                "projectId": 100,
                "externalId": "TC-01",
                "name": "Test Login",
                "priority": "HIGH",
                "tags": [{"name": "smoke"}, {"name": "auth"}],
                "description": "Preconditions:\nUser exists\n\n",
                "steps": [{"name": "Login", "expectedResult": "Success"}],
                "scenario": {"steps": [{"name": "Login", "expectedResult": "Success"}]}
            }));
        then.status(201)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"id": 1001, "externalId": "TC-01"}));
    });
    let broken_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/rs/testcase")
            .body_contains("Broken case");
        then.status(400).body("{\"message\":\"invalid priority\"}");
    });
    let logout_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/rs/testcase")
            .body_contains("\"name\":\"Logout\"")
            .body_contains("Login page shown");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"id": 1003}));
    });

    let config = cli(&[
        "-f",
        file.path().to_str().unwrap(),
        "-p",
        "100",
        "-e",
        &server.url("/api/rs/testcase"),
        "-t",
        "secret",
        "-b",
        "2",
    ]);
    assert!(config.validate().is_ok());

    let engine = MigrationEngine::new(
        config,
        FieldMapping::default(),
        Some(fast_client(server.url("/api/rs/testcase"))),
    )
    .unwrap();
    let summary = engine.run().await.unwrap();

    login_mock.assert();
    broken_mock.assert();
    logout_mock.assert();
    assert_eq!(summary.total(), 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(format!("{:.1}", summary.success_rate()), "66.7");
}

#[tokio::test]
async fn test_dry_run_makes_no_requests() {
    let file = csv_file(SAMPLE_CSV);
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(201);
    });

    let config = cli(&["-f", file.path().to_str().unwrap(), "--dry-run", "-v"]);
    assert!(config.validate().is_ok());

    let engine = MigrationEngine::new(
        config,
        FieldMapping::default(),
        Some(fast_client(server.url("/api/rs/testcase"))),
    )
    .unwrap();
    let summary = engine.run().await.unwrap();

    api_mock.assert_hits(0);
    assert_eq!(summary.succeeded, 3);
    assert!(summary.is_clean());
}

#[tokio::test]
async fn test_directory_as_csv_is_setup_error() {
    let dir = TempDir::new().unwrap();
    let config = cli(&["-f", dir.path().to_str().unwrap(), "--dry-run"]);

    let engine: MigrationEngine<_, TestOpsClient> =
        MigrationEngine::new(config, FieldMapping::default(), None).unwrap();

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, MigrationError::NotAFile { .. }));
}

#[tokio::test]
async fn test_custom_mapping_file_drives_payload() {
    let mapping_file = csv_file(
        r#"
step_separator = " >> "
expected_separator = " => "

[[fields]]
column = "Key"
target = { pass_through = "externalId" }

[[fields]]
column = "Summary"
target = { pass_through = "name" }

[[fields]]
column = "Labels"
target = "tags"

[[fields]]
column = "How"
target = "steps"
"#,
    );
    let data = csv_file("Key,Summary,Labels,How\nJ-7,Pay invoice,billing;smoke,Open => Opened >> Pay => Paid\n");

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST).json_body(serde_json::json!({
            "projectId": 9,
            "externalId": "J-7",
            "name": "Pay invoice",
            "tags": [{"name": "billing"}, {"name": "smoke"}],
            "steps": [
                {"name": "Open", "expectedResult": "Opened"},
                {"name": "Pay", "expectedResult": "Paid"}
            ],
            "scenario": {"steps": [
                {"name": "Open", "expectedResult": "Opened"},
                {"name": "Pay", "expectedResult": "Paid"}
            ]}
        }));
        then.status(201).json_body(serde_json::json!({"id": 5}));
    });

    let config = cli(&[
        "-f",
        data.path().to_str().unwrap(),
        "-p",
        "9",
        "-e",
        &server.url("/cases"),
        "-t",
        "secret",
        "--mapping",
        mapping_file.path().to_str().unwrap(),
    ]);
    let mapping: FieldMapping = config.field_mapping().unwrap();

    let engine =
        MigrationEngine::new(config, mapping, Some(fast_client(server.url("/cases")))).unwrap();
    let summary = engine.run().await.unwrap();

    api_mock.assert();
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn test_all_records_failing_still_produces_summary() {
    let file = csv_file("ID,Title\nA,one\nB,two\nC,three\n");
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(POST);
        then.status(500).body("down");
    });

    let config = cli(&[
        "-f",
        file.path().to_str().unwrap(),
        "-e",
        &server.url("/cases"),
        "-t",
        "secret",
    ]);
    let engine = MigrationEngine::new(
        config,
        FieldMapping::default(),
        Some(fast_client(server.url("/cases"))),
    )
    .unwrap();
    let summary = engine.run().await.unwrap();

    api_mock.assert_hits(3);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.success_rate(), 0.0);
    assert!(!summary.is_clean());
}
