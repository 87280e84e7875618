use super::CliError;
use anyhow::Context;
use ptrac_core::chain::FissionChainData;
use ptrac_core::decoder::PtracReader;
use ptrac_core::domain::NpsHistory;
use ptrac_core::format::{FormatConfig, load_format_config};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::BufRead;
use std::path::Path;
use tracing::info;

pub(super) fn load_config(path: Option<&Path>) -> Result<FormatConfig, CliError> {
    match path {
        Some(path) => {
            let config = load_format_config(path)?;
            info!(path = %path.display(), "loaded format configuration");
            Ok(config)
        }
        None => Ok(FormatConfig::default()),
    }
}

pub(super) fn open_reader(
    path: &Path,
    config: &FormatConfig,
) -> Result<PtracReader<std::io::BufReader<fs::File>>, CliError> {
    Ok(PtracReader::open(path, config.clone())?)
}

/// Reads one history and attaches the reader position to any failure.
pub(super) fn next_history<R: BufRead>(
    reader: &mut PtracReader<R>,
    max_histories: Option<u64>,
) -> Result<Option<NpsHistory>, CliError> {
    reader
        .read_next_history(max_histories.unwrap_or(u64::MAX))
        .map_err(|source| CliError::Decode {
            source,
            history_index: reader.histories_read() + 1,
            last_event_code: reader.last_event_code(),
        })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ChainReport {
    pub(super) ptrac: String,
    pub(super) histories_read: u64,
    pub(super) chains_built: u64,
    pub(super) skipped_nps: Vec<i64>,
    pub(super) skipped_count: u64,
    pub(super) reaction_counts: BTreeMap<&'static str, u64>,
    pub(super) multiplicity_counts: BTreeMap<&'static str, BTreeMap<usize, u64>>,
    pub(super) data: FissionChainData,
}

impl ChainReport {
    pub(super) fn new(
        ptrac: &Path,
        histories_read: u64,
        chains_built: u64,
        skipped_nps: Vec<i64>,
        data: FissionChainData,
    ) -> Self {
        let reaction_counts = data
            .reaction_counts()
            .into_iter()
            .map(|(reaction, count)| (reaction.as_str(), count))
            .collect::<BTreeMap<_, _>>();
        let multiplicity_counts = data
            .reaction_counts()
            .into_keys()
            .map(|reaction| (reaction.as_str(), data.multiplicity_counts(reaction)))
            .collect();
        Self {
            ptrac: ptrac.display().to_string(),
            histories_read,
            chains_built,
            skipped_count: skipped_nps.len() as u64,
            skipped_nps,
            reaction_counts,
            multiplicity_counts,
            data,
        }
    }
}

pub(super) fn write_json_report<T: Serialize>(path: &Path, report: &T) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report directory '{}'", parent.display()))?;
    }
    let rendered =
        serde_json::to_string_pretty(report).context("failed to serialize chain report")?;
    fs::write(path, format!("{rendered}\n"))
        .with_context(|| format!("failed to write report '{}'", path.display()))?;
    Ok(())
}
