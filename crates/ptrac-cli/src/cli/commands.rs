use super::CliError;
use super::helpers::{ChainReport, next_history, open_reader, write_json_report};
use anyhow::Context;
use ptrac_core::chain::{FissionChainData, build_fission_chain};
use ptrac_core::format::FormatConfig;
use ptrac_core::pulse::{DEFAULT_DETECTOR_CELL, Pulse, render_pulse_table};
use ptrac_core::serialization::write_text_artifact;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(clap::Args)]
pub(super) struct PulsesArgs {
    /// PTRAC binary file
    ptrac: PathBuf,

    /// Pulse table output path
    #[arg(long)]
    output: PathBuf,

    /// Cell whose energy deposition forms a pulse
    #[arg(long, default_value_t = DEFAULT_DETECTOR_CELL)]
    detector_cell: i64,

    /// Stop after this many histories
    #[arg(long)]
    max_histories: Option<u64>,

    /// Stop after this many pulses
    #[arg(long)]
    max_pulses: Option<usize>,
}

#[derive(clap::Args)]
pub(super) struct ChainsArgs {
    /// PTRAC binary file
    ptrac: PathBuf,

    /// JSON report output path
    #[arg(long)]
    report: PathBuf,

    /// Stop after this many histories
    #[arg(long)]
    max_histories: Option<u64>,
}

#[derive(clap::Args)]
pub(super) struct SummaryArgs {
    /// PTRAC binary file
    ptrac: PathBuf,

    /// Stop after this many histories
    #[arg(long)]
    max_histories: Option<u64>,
}

pub(super) fn run_pulses_command(args: PulsesArgs, config: &FormatConfig) -> Result<i32, CliError> {
    let mut reader = open_reader(&args.ptrac, config)?;
    let max_pulses = args.max_pulses.unwrap_or(usize::MAX);
    let mut pulses = Vec::new();

    'histories: while let Some(history) = next_history(&mut reader, args.max_histories)? {
        for particle in history.particles() {
            if pulses.len() >= max_pulses {
                break 'histories;
            }
            if let Some(pulse) =
                Pulse::from_particle_with_codes(particle, args.detector_cell, &config.event_codes)
            {
                pulses.push(pulse);
            }
        }
    }

    write_text_artifact(&args.output, &render_pulse_table(&pulses))
        .with_context(|| format!("failed to write pulse table '{}'", args.output.display()))?;
    info!(
        pulses = pulses.len(),
        histories = reader.histories_read(),
        "wrote pulse table"
    );
    println!(
        "{} pulses from {} histories written to {}",
        pulses.len(),
        reader.histories_read(),
        args.output.display()
    );
    Ok(0)
}

pub(super) fn run_chains_command(args: ChainsArgs, config: &FormatConfig) -> Result<i32, CliError> {
    let mut reader = open_reader(&args.ptrac, config)?;
    let mut data = FissionChainData::default();
    let mut chains_built = 0_u64;
    let mut skipped_nps = Vec::new();

    while let Some(history) = next_history(&mut reader, args.max_histories)? {
        match build_fission_chain(&history, config) {
            Ok(tree) => {
                data.absorb(&tree);
                chains_built += 1;
            }
            Err(error) if error.is_recoverable() => {
                warn!(nps = history.nps, "{}", error.diagnostic_line());
                skipped_nps.push(history.nps);
            }
            Err(source) => {
                // the failing history has already been counted
                return Err(CliError::Decode {
                    source,
                    history_index: reader.histories_read(),
                    last_event_code: reader.last_event_code(),
                });
            }
        }
    }

    let histories_read = reader.histories_read();
    let report = ChainReport::new(&args.ptrac, histories_read, chains_built, skipped_nps, data);
    write_json_report(&args.report, &report)?;
    info!(
        chains = chains_built,
        skipped = report.skipped_count,
        "wrote fission-chain report"
    );
    println!(
        "{} chains built from {} histories ({} skipped), report written to {}",
        chains_built,
        histories_read,
        report.skipped_count,
        args.report.display()
    );
    Ok(0)
}

pub(super) fn run_summary_command(args: SummaryArgs, config: &FormatConfig) -> Result<i32, CliError> {
    let mut reader = open_reader(&args.ptrac, config)?;
    let header = reader.header().clone();

    let mut particles = 0_usize;
    let mut events = 0_usize;
    while let Some(history) = next_history(&mut reader, args.max_histories)? {
        particles += history.len();
        events += history.event_count();
    }

    println!("banner:     {}", header.banner);
    println!("code:       {}", header.code_info);
    println!("title:      {}", header.title);
    println!("nps fields: {}", header.layout.nps_line);
    for kind in ptrac_core::format::FieldLayout::line_kinds() {
        let fields = header.layout.fields_for(kind);
        println!(
            "{:<10} long={} double={}",
            format!("{}:", kind.as_str()),
            fields.long,
            fields.double
        );
    }
    println!("histories:  {}", reader.histories_read());
    println!("particles:  {}", particles);
    println!("events:     {}", events);
    Ok(0)
}
