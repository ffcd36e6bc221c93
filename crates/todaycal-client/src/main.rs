//! fetch-todays-calendar CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use todaycal_client::cli::{Cli, Command};
use todaycal_client::commands::{self, Context, today::ReportOptions};
use todaycal_client::config::{AppPaths, AppSettings};
use todaycal_client::error::ClientResult;
use todaycal_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let paths = AppPaths::from_env(cli.config_dir.clone(), cli.data_dir.clone())?;

    if cli.data_location {
        println!("{}", paths.events_file().display());
        return Ok(());
    }

    paths.ensure_dirs()?;
    debug!(
        config_dir = %paths.config_dir().display(),
        data_dir = %paths.data_dir().display(),
        "paths resolved"
    );

    let settings = AppSettings::load(&paths.settings_file())?;
    let ctx = Context::new(paths, settings);

    match &cli.command {
        Some(Command::Auth { force }) => commands::auth::run(&ctx, *force).await,
        None => {
            let options = ReportOptions::from_cli(&cli, &ctx.settings);
            commands::today::run(&ctx, &options).await
        }
    }
}
