//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use todaycal_core::OutputFormat;

/// fetch-todays-calendar - Today's events from every Google calendar
#[derive(Debug, Parser)]
#[command(name = "fetch-todays-calendar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output the events as JSON
    #[arg(long)]
    pub json: bool,

    /// Store the events as JSON in the data directory (events.json)
    #[arg(long)]
    pub json_save: bool,

    /// Print the full path of the data file and exit
    #[arg(long)]
    pub data_location: bool,

    /// Only show the calendar with this name (default: all calendars)
    #[arg(long)]
    pub calendar: Option<String>,

    /// Keep going when a calendar cannot be read, listing it as skipped
    #[arg(long)]
    pub skip_failed_calendars: bool,

    /// Configuration directory holding credentials.json, token.json and config.toml
    ///
    /// Overrides APP_CONFIG_DIR, which is resolved relative to the home
    /// directory.
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Data directory holding events.json
    ///
    /// Overrides APP_DATA_DIR, which is resolved relative to the home
    /// directory.
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', env = "TODAYCAL_DEBUG")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Returns the stdout format based on CLI flags.
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }

    /// Returns whether the report should be printed at all.
    ///
    /// `--json-save` on its own only writes the data file.
    pub fn prints_report(&self) -> bool {
        self.json || !self.json_save
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize access to Google Calendar without fetching events
    Auth {
        /// Discard the stored token and ask for consent again
        #[arg(long, short)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fetch-todays-calendar").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn default_is_text_report() {
        let cli = parse(&[]);
        assert_eq!(cli.output_format(), OutputFormat::Text);
        assert!(cli.prints_report());
        assert!(cli.command.is_none());
    }

    #[test]
    fn json_flags() {
        let cli = parse(&["--json"]);
        assert_eq!(cli.output_format(), OutputFormat::Json);
        assert!(cli.prints_report());

        let cli = parse(&["--json-save"]);
        assert!(!cli.prints_report());

        let cli = parse(&["--json", "--json-save"]);
        assert!(cli.prints_report());
        assert!(cli.json_save);
    }

    #[test]
    fn calendar_and_dirs() {
        let cli = parse(&[
            "--calendar",
            "Work",
            "--config-dir",
            "/tmp/cfg",
            "--data-dir",
            "/tmp/data",
            "--skip-failed-calendars",
        ]);
        assert_eq!(cli.calendar.as_deref(), Some("Work"));
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cfg")));
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/data")));
        assert!(cli.skip_failed_calendars);
    }

    #[test]
    fn auth_subcommand() {
        let cli = parse(&["auth", "--force"]);
        assert!(matches!(cli.command, Some(Command::Auth { force: true })));

        let cli = parse(&["auth"]);
        assert!(matches!(cli.command, Some(Command::Auth { force: false })));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
