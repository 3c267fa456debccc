use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use nuccore_fetch::app::{App, ProgressSink};
use nuccore_fetch::config::{CliOverrides, ConfigLoader, split_accession_args};
use nuccore_fetch::domain::ReportFormat;
use nuccore_fetch::error::NuccoreError;
use nuccore_fetch::ncbi::NuccoreHttpClient;
use nuccore_fetch::output::{JsonOutput, OutputMode};
use nuccore_fetch::status::StatusLine;

#[derive(Parser)]
#[command(name = "nuccore-fetch")]
#[command(about = "Download NCBI FASTA file(s) from nuccore")]
#[command(version, author)]
struct Cli {
    /// NCBI nuccore accession(s); whitespace-separated lists are split
    #[arg(short, long, num_args = 1..)]
    accession: Vec<String>,

    /// Output directory [default: ./ncbi_nuccore_download]
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Record format(s) to download [default: fasta]
    #[arg(short, long, value_enum, num_args = 1..)]
    format: Vec<ReportFormat>,

    /// JSON request file listing accessions
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print a JSON report instead of the status line
    #[arg(long)]
    non_interactive: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

enum Outcome {
    Success,
    InvalidAccessions,
    FetchFailures,
}

fn main() -> ExitCode {
    match run() {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::InvalidAccessions) => ExitCode::from(2),
        Ok(Outcome::FetchFailures) => ExitCode::from(3),
        Err(report) => {
            eprintln!("{report:?}");
            if let Some(err) = report.downcast_ref::<NuccoreError>() {
                return ExitCode::from(map_exit_code(err));
            }
            ExitCode::from(1)
        }
    }
}

fn map_exit_code(error: &NuccoreError) -> u8 {
    match error {
        NuccoreError::EmptyAccessionList => 2,
        err if err.is_network() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<Outcome> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = cli
        .config
        .as_deref()
        .map(ConfigLoader::load)
        .transpose()?;
    let request = ConfigLoader::resolve(
        CliOverrides {
            accessions: split_accession_args(&cli.accession),
            outdir: cli.outdir,
            formats: cli.format,
        },
        config,
    )?;

    let client = NuccoreHttpClient::with_timeout(Duration::from_secs(cli.timeout))?;
    let app = App::new(client);

    let sink: Box<dyn ProgressSink> = match output_mode {
        OutputMode::Interactive => Box::new(StatusLine::new()),
        OutputMode::NonInteractive => Box::new(JsonOutput),
    };

    let report = app.download(&request, sink.as_ref())?;

    if matches!(output_mode, OutputMode::NonInteractive) {
        JsonOutput::print_report(&report).into_diagnostic()?;
    }

    Ok(if report.has_fetch_failures() {
        Outcome::FetchFailures
    } else if report.has_invalid() {
        Outcome::InvalidAccessions
    } else {
        Outcome::Success
    })
}
