use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use scan_report::config::{Command, Config};
use scan_report::storage::Database;
use scan_report::cli::Outcome;
use scan_report::{ReportRepository, cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args();

    if config.command == Command::Version {
        println!(
            "scan-report {}, rustc: {}, build_date: {}",
            env!("CARGO_PKG_VERSION"),
            env!("VERGEN_RUSTC_SEMVER"),
            env!("VERGEN_BUILD_TIMESTAMP"),
        );
        return Ok(());
    }

    logging::init(&config.log_format, &config.log_level)?;

    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }

    let db_path = config.get_db_path();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        db_path = %db_path,
        timeout_secs = config.timeout_secs,
        "scan-report starting"
    );

    let db = Arc::new(Database::new(&db_path).context("Failed to open report database")?);
    let repo = ReportRepository::new(db.clone(), db);
    let ctx = config.context();

    let outcome = cli::run(repo, ctx, config.command.clone(), tokio::signal::ctrl_c()).await?;
    let code = outcome.exit_code();

    match outcome {
        Outcome::Finished(Ok(output)) => {
            println!("{}", output);
            Ok(())
        }
        Outcome::Finished(Err(e)) => {
            error!(error = %format!("{:#}", e), "Command failed");
            std::process::exit(code);
        }
        Outcome::Interrupted(Ok(output)) => {
            warn!(output = %output, "Command completed before cancellation took effect");
            std::process::exit(code);
        }
        Outcome::Interrupted(Err(e)) => {
            error!(error = %format!("{:#}", e), "Command interrupted");
            std::process::exit(code);
        }
    }
}
