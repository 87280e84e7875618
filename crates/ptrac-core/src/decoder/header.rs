use crate::domain::{PtracError, PtracResult};
use crate::format::{FieldLayout, FormatConfig, LineFields};
use crate::record::{RecordBuffer, read_record};
use serde::Serialize;
use std::io::Read;
use tracing::{debug, info};

/// Descriptive header records plus the field layout they declare.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PtracHeader {
    pub banner: String,
    pub code_info: String,
    pub title: String,
    /// Output-control descriptor values skipped in record 4.
    pub descriptor_count: usize,
    pub layout: FieldLayout,
}

pub(super) fn parse_header<R: Read>(
    reader: &mut R,
    config: &FormatConfig,
) -> PtracResult<PtracHeader> {
    let banner = record_text(&read_record(reader)?);
    let code_info = record_text(&read_record(reader)?);
    let title = record_text(&read_record(reader)?);
    let descriptor_count = skip_input_descriptors(reader, config)?;
    let layout = parse_field_layout(reader, config)?;
    skip_nps_variable_ids(reader, config, layout.nps_line)?;
    validate_event_offset(config, &layout)?;

    info!(title = %title, code = %code_info, "parsed PTRAC header");
    debug!(?layout, descriptor_count, "PTRAC field layout");

    Ok(PtracHeader {
        banner,
        code_info,
        title,
        descriptor_count,
        layout,
    })
}

fn record_text(record: &RecordBuffer) -> String {
    String::from_utf8_lossy(record.as_bytes())
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

/// Record 4: a total group count followed by `(size, size x value)` groups.
/// Groups may continue in the following physical records.
fn skip_input_descriptors<R: Read>(reader: &mut R, config: &FormatConfig) -> PtracResult<usize> {
    let width = config.value_width;
    let mut record = read_record(reader)?;
    let total_groups = record.read_value(width)? as i64;
    let mut groups_read = 0_i64;
    let mut pending_values = 0_i64;
    let mut values_skipped = 0_usize;

    while groups_read < total_groups || pending_values > 0 {
        if record.is_exhausted() {
            record = read_record(reader)?;
            continue;
        }
        if pending_values == 0 {
            pending_values = record.read_value(width)? as i64;
            groups_read += 1;
        } else {
            record.read_value(width)?;
            pending_values -= 1;
            values_skipped += 1;
        }
    }

    Ok(values_skipped)
}

/// Record 5: `i32` NPS-line field count, then long/double counts for the
/// source, bank, surface, collision and terminal lines.
fn parse_field_layout<R: Read>(reader: &mut R, config: &FormatConfig) -> PtracResult<FieldLayout> {
    let mut record = read_record(reader)?;
    let nps_line = field_count(i64::from(record.read_i32()?), "NPS line")?;

    let mut line = |name: &str| -> PtracResult<LineFields> {
        let long = field_count(record.read_count(config.count_width)?, name)?;
        let double = field_count(record.read_count(config.count_width)?, name)?;
        Ok(LineFields { long, double })
    };

    Ok(FieldLayout {
        nps_line,
        source: line("source")?,
        bank: line("bank")?,
        surface: line("surface")?,
        collision: line("collision")?,
        terminal: line("terminal")?,
    })
}

fn field_count(value: i64, line: &str) -> PtracResult<usize> {
    usize::try_from(value).map_err(|_| {
        PtracError::config(format!(
            "negative field count {value} declared for the {line} line; check countWidth"
        ))
    })
}

/// Record 6: variable identifiers, of which only the NPS-line ones are
/// walked over. They are written at count width regardless of their type.
fn skip_nps_variable_ids<R: Read>(
    reader: &mut R,
    config: &FormatConfig,
    nps_line: usize,
) -> PtracResult<()> {
    let mut record = read_record(reader)?;
    for _ in 0..nps_line {
        record.read_count(config.count_width)?;
    }
    Ok(())
}

fn validate_event_offset(config: &FormatConfig, layout: &FieldLayout) -> PtracResult<()> {
    for kind in FieldLayout::line_kinds() {
        let fields = layout.fields_for(kind);
        if fields.long <= config.offsets.event {
            return Err(PtracError::config(format!(
                "{} lines declare {} long fields but the event code sits at offset {}",
                kind.as_str(),
                fields.long,
                config.offsets.event
            )));
        }
    }
    Ok(())
}
