#![warn(rust_2018_idioms)]

use std::sync::Arc;

use clap::Parser;
use struct_log::LogBuilder;
use vault_stress::{Cli, Driver, HarnessError, RunContext};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let guard = match LogBuilder::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .json(cli.json_log)
        .default_directive(if cli.verbose { "debug" } else { "info" })
        .init()
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Unable to set up logging: {e}");
            std::process::exit(1);
        }
    };

    let code = match run(cli).await {
        Ok(()) => {
            tracing::info!("Program exit.");
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error, exiting");
            1
        }
    };

    // flush buffered log lines before exiting
    drop(guard);
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), HarnessError> {
    let config = cli.run_config()?;
    tracing::info!(
        vault = %config.vault_addr,
        role = %config.auth_role,
        db = %config.db_role,
        mode = ?config.mode,
        concurrency = config.concurrency,
        "Configuration resolved"
    );

    let client = cli.vault_client()?;
    let ctx = RunContext::establish(config, Arc::new(client)).await?;
    let driver = Driver::new(ctx);

    driver.run_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Unable to listen for Ctrl-C, running without graceful shutdown");
        std::future::pending::<()>().await;
    }
}
