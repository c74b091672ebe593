use crate::utils::error::{MigrationError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn build_filter(verbose: bool) -> EnvFilter {
    let default_directive = if verbose {
        "testcase_migrate=debug,info"
    } else {
        "testcase_migrate=info"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// 在程序啟動時安裝一次 subscriber；重複呼叫會回傳錯誤而不是靜默略過。
pub fn init_cli_logger(verbose: bool, json: bool) -> Result<()> {
    let registry = tracing_subscriber::registry().with(build_filter(verbose));

    let installed = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .json()
                    .with_current_span(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .try_init()
    };

    installed.map_err(|e| MigrationError::ConfigError {
        message: format!("logger already initialized: {}", e),
    })
}
