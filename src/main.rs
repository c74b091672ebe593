use clap::Parser;
use testcase_migrate::utils::error::ErrorSeverity;
use testcase_migrate::utils::{logger, validation::Validate};
use testcase_migrate::{CliConfig, MigrationEngine, MigrationError, TestOpsClient};

fn exit_code(e: &MigrationError) -> i32 {
    match e.severity() {
        ErrorSeverity::Medium | ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: MigrationError) -> ! {
    tracing::error!(
        "❌ Migration failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose, config.json_logs)?;
    tracing::info!("Starting testcase-migrate");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        fail(e);
    }

    let mapping = config.field_mapping().unwrap_or_else(|e| fail(e));

    let submitter = match config.client_settings() {
        Ok(Some(settings)) if !config.dry_run => {
            tracing::info!("📡 API Call: POST {}", settings.endpoint);
            Some(TestOpsClient::new(settings).unwrap_or_else(|e| fail(e)))
        }
        Ok(_) => None,
        Err(e) => fail(e),
    };

    let engine = MigrationEngine::new(config, mapping, submitter).unwrap_or_else(|e| fail(e));

    match engine.run().await {
        Ok(summary) if summary.is_clean() => {
            println!("✅ Migration completed: {}", summary);
            Ok(())
        }
        Ok(summary) => {
            eprintln!("❌ Migration finished with failures: {}", summary);
            std::process::exit(1);
        }
        Err(e) => fail(e),
    }
}
