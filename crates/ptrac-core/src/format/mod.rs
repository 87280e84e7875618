//! Format-variant parameters and the per-file field layout.
//!
//! [`FormatConfig`] is chosen by the caller (or loaded from JSON) before a
//! file is opened; [`FieldLayout`] is read from the file header. Both are
//! immutable once the reader is constructed.

mod reactions;

pub use crate::record::{CountWidth, ValueWidth};
pub use reactions::{CollisionOutcome, ReactionEntry, ReactionTable};

use crate::domain::FormatConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LineKind {
    Source,
    Bank,
    Surface,
    Collision,
    Terminal,
}

impl LineKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Bank => "bank",
            Self::Surface => "surface",
            Self::Collision => "collision",
            Self::Terminal => "terminal",
        }
    }
}

/// Number of slots in the long and double groups of one event line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct LineFields {
    pub long: usize,
    pub double: usize,
}

/// Field counts declared by the header for each event-line kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FieldLayout {
    pub nps_line: usize,
    pub source: LineFields,
    pub bank: LineFields,
    pub surface: LineFields,
    pub collision: LineFields,
    pub terminal: LineFields,
}

impl FieldLayout {
    pub const fn fields_for(&self, kind: LineKind) -> LineFields {
        match kind {
            LineKind::Source => self.source,
            LineKind::Bank => self.bank,
            LineKind::Surface => self.surface,
            LineKind::Collision => self.collision,
            LineKind::Terminal => self.terminal,
        }
    }

    pub const fn line_kinds() -> [LineKind; 5] {
        [
            LineKind::Source,
            LineKind::Bank,
            LineKind::Surface,
            LineKind::Collision,
            LineKind::Terminal,
        ]
    }
}

/// Slot positions inside the long and double groups of a data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldOffsets {
    pub event: usize,
    pub cell: usize,
    pub nuclide: usize,
    pub reaction: usize,
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub energy: usize,
    pub weight: usize,
    pub time: usize,
}

impl Default for FieldOffsets {
    fn default() -> Self {
        Self {
            event: 0,
            cell: 5,
            nuclide: 2,
            reaction: 3,
            x: 0,
            y: 1,
            z: 2,
            energy: 6,
            weight: 7,
            time: 8,
        }
    }
}

/// Structural role of a raw event code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Primary source emission.
    Source,
    /// Banked particle that is a spontaneous-fission emission.
    SpontaneousBank,
    /// Banked particle produced by a reaction on a tracked neutron.
    InducedBank,
    Surface,
    Collision,
    Terminal,
    EndOfHistory,
    Unknown,
}

impl EventKind {
    /// Events that may open an NPS record.
    pub const fn is_source_class(self) -> bool {
        matches!(self, Self::Source | Self::SpontaneousBank)
    }

    /// Events that mark the birth of a tracked particle.
    pub const fn is_creation(self) -> bool {
        matches!(self, Self::Source | Self::SpontaneousBank | Self::InducedBank)
    }

    /// Layout used to decode the data line of an event of this kind.
    /// Unknown codes fall back to the bank layout.
    pub const fn line_kind(self) -> LineKind {
        match self {
            Self::Source => LineKind::Source,
            Self::SpontaneousBank | Self::InducedBank | Self::Unknown => LineKind::Bank,
            Self::Surface => LineKind::Surface,
            Self::Collision => LineKind::Collision,
            Self::Terminal | Self::EndOfHistory => LineKind::Terminal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventCodeTable {
    pub source: Vec<i64>,
    pub spontaneous_bank: Vec<i64>,
    pub induced_bank: Vec<i64>,
    pub surface: i64,
    pub collision: i64,
    pub terminal: i64,
    pub end_of_history: i64,
}

impl Default for EventCodeTable {
    fn default() -> Self {
        Self {
            source: vec![1000],
            spontaneous_bank: vec![2000, 2030],
            induced_bank: vec![2007],
            surface: 3000,
            collision: 4000,
            terminal: 5000,
            end_of_history: 9000,
        }
    }
}

impl EventCodeTable {
    pub fn classify(&self, code: i64) -> EventKind {
        if self.source.contains(&code) {
            EventKind::Source
        } else if self.spontaneous_bank.contains(&code) {
            EventKind::SpontaneousBank
        } else if self.induced_bank.contains(&code) {
            EventKind::InducedBank
        } else if code == self.surface {
            EventKind::Surface
        } else if code == self.collision {
            EventKind::Collision
        } else if code == self.terminal {
            EventKind::Terminal
        } else if code == self.end_of_history {
            EventKind::EndOfHistory
        } else {
            EventKind::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParentLookup {
    /// Pre-order scan of every inserted node.
    #[default]
    LinearScan,
    /// Hash index on destruction time and position.
    Indexed,
}

/// Everything that varies between trace-format flavours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatConfig {
    pub value_width: ValueWidth,
    pub count_width: CountWidth,
    pub offsets: FieldOffsets,
    pub event_codes: EventCodeTable,
    pub reactions: ReactionTable,
    pub expected_cells: Vec<i64>,
    pub parent_lookup: ParentLookup,
}

impl FormatConfig {
    pub fn classify(&self, code: i64) -> EventKind {
        self.event_codes.classify(code)
    }

    pub fn is_expected_cell(&self, cell: i64) -> bool {
        self.expected_cells.is_empty() || self.expected_cells.contains(&cell)
    }
}

pub fn load_format_config(path: impl AsRef<Path>) -> Result<FormatConfig, FormatConfigError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| FormatConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| FormatConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
