//! Default command: today's events across every calendar.

use std::io::Write;

use tracing::{debug, info};

use todaycal_core::{DailyEventReport, FormatOptions, OutputFormat, ReportFormatter, snapshot_json};
use todaycal_providers::google::{CredentialManager, GoogleCalendarClient};
use todaycal_providers::{EventQueryEngine, FailurePolicy};

use crate::cli::Cli;
use crate::commands::Context;
use crate::config::{AppPaths, AppSettings};
use crate::error::ClientResult;

/// What to do with the report once it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Stdout format.
    pub format: OutputFormat,
    /// Whether anything is printed on stdout.
    pub print: bool,
    /// Whether the JSON snapshot is written to the data directory.
    pub save: bool,
    /// Only print calendars with this name.
    pub calendar: Option<String>,
    /// How a failing calendar is handled.
    pub policy: FailurePolicy,
}

impl ReportOptions {
    /// Combines CLI flags with `config.toml`; flags win.
    pub fn from_cli(cli: &Cli, settings: &AppSettings) -> Self {
        let policy = if cli.skip_failed_calendars || settings.skip_failed_calendars {
            FailurePolicy::SkipFailed
        } else {
            FailurePolicy::Abort
        };
        Self {
            format: cli.output_format(),
            print: cli.prints_report(),
            save: cli.json_save,
            calendar: cli.calendar.clone().or_else(|| settings.calendar.clone()),
            policy,
        }
    }
}

/// Authorizes, fetches today's events and emits them.
pub async fn run(ctx: &Context, options: &ReportOptions) -> ClientResult<()> {
    let config = ctx.google_config();
    let manager = CredentialManager::new(&config)?;
    let credentials = ctx.load_credentials(&manager)?;
    let session = manager.authorize(&config.scopes, credentials.as_ref()).await?;
    debug!(state = ?session.state(), "session ready");

    let client = GoogleCalendarClient::new(&config, session)?;
    let engine = EventQueryEngine::new(client).with_failure_policy(options.policy);
    let report = engine.list_all_events().await?;
    info!(
        calendars = report.calendars.len(),
        events = report.event_count(),
        skipped = report.skipped.len(),
        "report built"
    );

    let stdout = std::io::stdout();
    emit(&report, options, &ctx.paths, &mut stdout.lock())
}

/// Writes the snapshot and prints the report as requested.
pub fn emit<W: Write>(
    report: &DailyEventReport,
    options: &ReportOptions,
    paths: &AppPaths,
    out: &mut W,
) -> ClientResult<()> {
    if options.save {
        let path = paths.events_file();
        std::fs::write(&path, snapshot_json(report)?)?;
        info!(path = %path.display(), "saved events snapshot");
    }

    if options.print {
        let formatter = ReportFormatter::new(FormatOptions {
            calendar_filter: options.calendar.clone(),
            ..FormatOptions::default()
        });
        let rendered = match options.format {
            OutputFormat::Text => formatter.format_text(report),
            OutputFormat::Json => formatter.format_json(report)?,
        };
        writeln!(out, "{}", rendered)?;
    }
    Ok(())
}
