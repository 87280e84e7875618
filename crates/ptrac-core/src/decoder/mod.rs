//! Sequential PTRAC history decoder.
//!
//! A [`PtracReader`] owns its stream for its whole lifetime. The header is
//! parsed on construction; afterwards each call to
//! [`PtracReader::read_next_history`] decodes exactly one NPS record:
//!
//! ```text
//! NPS line:  (nps, code of first event)
//! data line: long group (stored as reals) | double group
//!            long[event] holds the code of the *next* event
//! ```
//!
//! The history ends after the data line whose next-event code is the
//! end-of-history sentinel.

mod header;

pub use header::PtracHeader;

use crate::domain::{
    CollisionData, Event, NpsHistory, ParticleHistory, PtracError, PtracResult,
};
use crate::format::{EventKind, FieldLayout, FormatConfig, LineFields};
use crate::record::{RecordBuffer, at_end_of_stream, read_record};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    /// Header consumed, no history decoded yet.
    HeaderParsed,
    /// At least one history decoded, more may follow.
    Ready,
    /// End of stream reached.
    Exhausted,
    /// A fatal decode error occurred; no further data is produced.
    Failed,
}

/// Quantities that persist from one data line to the next when a line kind
/// does not carry them.
#[derive(Debug, Clone, Copy, Default)]
struct LineValues {
    cell: i64,
    position: [f64; 3],
    energy: f64,
    weight: f64,
    time: f64,
}

pub struct PtracReader<R> {
    reader: R,
    config: FormatConfig,
    header: PtracHeader,
    state: ReaderState,
    histories_read: u64,
    last_event_code: Option<i64>,
}

impl PtracReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, config: FormatConfig) -> PtracResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), config)
    }
}

impl<R: BufRead> PtracReader<R> {
    pub fn from_reader(mut reader: R, config: FormatConfig) -> PtracResult<Self> {
        let header = header::parse_header(&mut reader, &config)?;
        Ok(Self {
            reader,
            config,
            header,
            state: ReaderState::HeaderParsed,
            histories_read: 0,
            last_event_code: None,
        })
    }

    pub fn header(&self) -> &PtracHeader {
        &self.header
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.header.layout
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn histories_read(&self) -> u64 {
        self.histories_read
    }

    /// Raw code of the most recent event seen, for diagnostics.
    pub fn last_event_code(&self) -> Option<i64> {
        self.last_event_code
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Decodes the next NPS record, or returns `None` once `max_count`
    /// histories have been read or the stream is exhausted.
    pub fn read_next_history(&mut self, max_count: u64) -> PtracResult<Option<NpsHistory>> {
        if matches!(self.state, ReaderState::Exhausted | ReaderState::Failed) {
            return Ok(None);
        }
        if self.histories_read >= max_count {
            return Ok(None);
        }

        match self.decode_history() {
            Ok(Some(history)) => {
                self.histories_read += 1;
                self.state = ReaderState::Ready;
                Ok(Some(history))
            }
            Ok(None) => {
                debug!(histories = self.histories_read, "end of PTRAC stream");
                self.state = ReaderState::Exhausted;
                Ok(None)
            }
            Err(error) => {
                self.state = ReaderState::Failed;
                Err(error)
            }
        }
    }

    pub fn histories(&mut self, max_count: u64) -> Histories<'_, R> {
        Histories {
            reader: self,
            max_count,
        }
    }

    fn decode_history(&mut self) -> PtracResult<Option<NpsHistory>> {
        if at_end_of_stream(&mut self.reader)? {
            return Ok(None);
        }

        let count_width = self.config.count_width;
        let mut nps_line = read_record(&mut self.reader)?;
        let nps = nps_line.read_count(count_width)?;
        let mut event_code = nps_line.read_count(count_width)?;
        self.last_event_code = Some(event_code);

        if !self.config.classify(event_code).is_source_class() {
            return Err(PtracError::ProtocolViolation { nps, event_code });
        }

        let mut particles = Vec::new();
        let mut current = ParticleHistory::default();
        let mut values = LineValues::default();

        loop {
            let kind = self.config.classify(event_code);
            if kind == EventKind::Unknown {
                warn!(nps, event_code, "unrecognized event code, decoding with bank layout");
            }

            let fields = self.header.layout.fields_for(kind.line_kind());
            let mut line = read_record(&mut self.reader)?;
            let decoded = self.decode_line(&mut line, fields, kind, &mut values)?;
            if !line.is_exhausted() {
                debug!(nps, event_code, trailing = line.remaining(), "ignoring trailing bytes");
            }

            if !self.config.is_expected_cell(values.cell) {
                warn!(nps, event_code, cell = values.cell, "event in unexpected cell");
            }

            let event = Event {
                particle_id: nps,
                event_code,
                cell_id: values.cell,
                position: values.position,
                energy: values.energy,
                weight: values.weight,
                time: values.time,
                collision: decoded.collision,
            };

            if kind.is_creation() && !current.is_empty() {
                particles.push(std::mem::take(&mut current));
            }
            current.push(event);
            if kind == EventKind::Terminal {
                particles.push(std::mem::take(&mut current));
            }

            self.last_event_code = Some(decoded.next_event_code);
            if self.config.classify(decoded.next_event_code) == EventKind::EndOfHistory {
                break;
            }
            event_code = decoded.next_event_code;
        }

        if !current.is_empty() {
            particles.push(current);
        }

        debug!(nps, particles = particles.len(), "decoded history");
        Ok(Some(NpsHistory::new(nps, particles)))
    }

    fn decode_line(
        &self,
        line: &mut RecordBuffer,
        fields: LineFields,
        kind: EventKind,
        values: &mut LineValues,
    ) -> PtracResult<DecodedLine> {
        let width = self.config.value_width;
        let offsets = &self.config.offsets;
        let is_collision = kind == EventKind::Collision;

        let mut next_event_code = None;
        let mut nuclide = None;
        let mut reaction = None;
        for slot in 0..fields.long {
            // integral quantities are stored at real width
            let value = line.read_value(width)? as i64;
            if slot == offsets.event {
                next_event_code = Some(value);
            } else if slot == offsets.cell {
                values.cell = value;
            } else if is_collision && slot == offsets.nuclide {
                nuclide = Some(value);
            } else if is_collision && slot == offsets.reaction {
                reaction = Some(value);
            }
        }

        for slot in 0..fields.double {
            let value = line.read_value(width)?;
            if slot == offsets.x {
                values.position[0] = value;
            } else if slot == offsets.y {
                values.position[1] = value;
            } else if slot == offsets.z {
                values.position[2] = value;
            } else if slot == offsets.energy {
                values.energy = value;
            } else if slot == offsets.weight {
                values.weight = value;
            } else if slot == offsets.time {
                values.time = value;
            }
        }

        let next_event_code = next_event_code.ok_or_else(|| {
            PtracError::config(format!(
                "event offset {} outside the {} long fields of this line",
                offsets.event, fields.long
            ))
        })?;
        let collision = match (nuclide, reaction) {
            (Some(nuclide), Some(reaction)) => Some(CollisionData { nuclide, reaction }),
            _ => None,
        };

        Ok(DecodedLine {
            next_event_code,
            collision,
        })
    }
}

struct DecodedLine {
    next_event_code: i64,
    collision: Option<CollisionData>,
}

/// Iterator over the remaining histories of a reader.
pub struct Histories<'a, R> {
    reader: &'a mut PtracReader<R>,
    max_count: u64,
}

impl<R: BufRead> Iterator for Histories<'_, R> {
    type Item = PtracResult<NpsHistory>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_next_history(self.max_count).transpose()
    }
}
