mod commands;
mod helpers;

use clap::Parser;
use ptrac_core::domain::{FormatConfigError, PtracError, PtracErrorKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error.diagnostic_line());
            if let Some(summary_line) = error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("ptrac".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing(&cli.log_level)?;
            let config = helpers::load_config(cli.config.as_deref())?;
            dispatch_parsed(cli.command, &config)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_tracing(level: &str) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|error| CliError::Usage(format!("invalid --log-level '{level}': {error}")))?,
    };
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        // the subscriber installed first stays in charge
        tracing::debug!(%error, "tracing subscriber already installed");
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "ptrac", about = "MCNP PTRAC decoder and fission-chain extractor")]
struct Cli {
    /// JSON format configuration (value widths, offsets, event codes, reactions)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `ptrac_core=debug`
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Extract detector pulses into a fixed-width text table
    Pulses(commands::PulsesArgs),
    /// Reconstruct fission chains and write a JSON report
    Chains(commands::ChainsArgs),
    /// Print header text, field layout and history counts
    Summary(commands::SummaryArgs),
}

fn dispatch_parsed(
    command: CliCommand,
    config: &ptrac_core::format::FormatConfig,
) -> Result<i32, CliError> {
    match command {
        CliCommand::Pulses(args) => commands::run_pulses_command(args, config),
        CliCommand::Chains(args) => commands::run_chains_command(args, config),
        CliCommand::Summary(args) => commands::run_summary_command(args, config),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] FormatConfigError),
    #[error(transparent)]
    Compute(#[from] PtracError),
    #[error(
        "{source} (history index {history_index}, last event code {})",
        describe_event_code(*last_event_code)
    )]
    Decode {
        source: PtracError,
        /// One-based position of the failing history in the file.
        history_index: u64,
        last_event_code: Option<i64>,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn describe_event_code(code: Option<i64>) -> String {
    code.map_or_else(|| "none".to_string(), |code| code.to_string())
}

impl CliError {
    fn placeholder(&self) -> &'static str {
        match self {
            Self::Usage(_) => "INPUT.CLI_USAGE",
            Self::Config(_) => PtracErrorKind::Config.placeholder(),
            Self::Compute(error) | Self::Decode { source: error, .. } => error.kind().placeholder(),
            Self::Internal(_) => "IO.CLI",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::Config(_) => 2,
            Self::Compute(error) | Self::Decode { source: error, .. } => error.exit_code(),
            Self::Internal(_) => PtracErrorKind::Io.exit_code(),
        }
    }

    pub fn diagnostic_line(&self) -> String {
        match self {
            Self::Internal(error) => format!("ERROR: [{}] {error:#}", self.placeholder()),
            _ => format!("ERROR: [{}] {}", self.placeholder(), self),
        }
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        Some(format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}
