//! `clientmerge` command line.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use clientmerge_observability::{LogFormat, LogOptions};
use clientmerge_report::{ClientWorkbook, ReportSettings};

#[derive(Debug, Parser)]
#[command(name = "clientmerge", version)]
#[command(about = "Consolidate client rows from workbook sheets into per-client reports")]
pub struct Cli {
    /// Settings file. Defaults to <WORKBOOK>/clientmerge.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the data element dictionary sheet from the content sheet headers.
    Init { workbook: PathBuf },
    /// Validate the settings and the data element dictionary.
    Check { workbook: PathBuf },
    /// Print the data element dictionary.
    Ded {
        workbook: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Resolve client identities and write the destination reports.
    Report {
        workbook: PathBuf,
        /// Only log warnings and errors while processing sheets.
        #[arg(long, default_value_t = false)]
        quiet: bool,
    },
}

impl Command {
    pub fn workbook(&self) -> &Path {
        match self {
            Command::Init { workbook }
            | Command::Check { workbook }
            | Command::Ded { workbook, .. }
            | Command::Report { workbook, .. } => workbook,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            format: self.log_format.into(),
            ..LogOptions::default()
        }
        .with_verbosity(self.verbose)
    }
}

fn open_workbook(cli: &Cli) -> anyhow::Result<ClientWorkbook> {
    let dir = cli.command.workbook();
    let settings = ReportSettings::for_workbook(dir, cli.config.as_deref())
        .context("failed to load settings")?;
    ClientWorkbook::open(dir, settings)
        .with_context(|| format!("failed to open workbook {}", dir.display()))
}

/// Execute the parsed command, writing user-facing output to `out`.
pub fn run(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let mut workbook = open_workbook(cli)?;
    let ded_name = workbook.settings().ded_sheet_name.clone();

    match &cli.command {
        Command::Init { .. } => {
            if workbook.create_ded_worksheet()? {
                writeln!(out, "created '{ded_name}'; fill it in, then run `clientmerge check`")?;
            } else {
                writeln!(out, "'{ded_name}' already exists; nothing to do")?;
            }
        }
        Command::Check { .. } => {
            let ded = workbook.dictionary().context("data element dictionary is invalid")?;
            let sheets = workbook.content_sheet_names()?;
            writeln!(
                out,
                "ok: {} data elements ({} identifiers), {} destinations",
                ded.len(),
                ded.identifiers().count(),
                ded.destinations().len()
            )?;
            writeln!(out, "content sheets: {}", sheets.join(", "))?;
        }
        Command::Ded { json, .. } => {
            let ded = workbook.dictionary().context("data element dictionary is invalid")?;
            if *json {
                writeln!(out, "{}", ded.to_json()?)?;
            } else {
                write!(out, "{}", ded.report())?;
            }
        }
        Command::Report { quiet, .. } => {
            let summary = workbook
                .create_client_reports(*quiet)
                .context("report run failed")?;
            tracing::debug!(run_id = %summary.run_id, "report run finished");
            writeln!(out, "{summary}")?;
        }
    }
    Ok(())
}
