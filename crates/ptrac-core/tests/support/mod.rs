#![allow(dead_code)]

use ptrac_core::format::{CountWidth, ValueWidth};
use std::fs;
use std::path::{Path, PathBuf};

pub const LONG_FIELDS: usize = 6;
pub const DOUBLE_FIELDS: usize = 9;
pub const END_OF_HISTORY: i64 = 9000;

/// `(long, double)` counts per line kind, in header order: source, bank,
/// surface, collision, terminal.
pub type FixtureLayout = [(usize, usize); 5];

pub const UNIFORM_LAYOUT: FixtureLayout = [(LONG_FIELDS, DOUBLE_FIELDS); 5];

#[derive(Debug, Clone, Copy)]
pub struct FixtureEvent {
    pub code: i64,
    pub cell: i64,
    pub position: [f64; 3],
    pub energy: f64,
    pub weight: f64,
    pub time: f64,
    pub collision: Option<(i64, i64)>,
}

impl FixtureEvent {
    pub fn new(code: i64, cell: i64, time: f64) -> Self {
        Self {
            code,
            cell,
            position: [0.0; 3],
            energy: 1.0,
            weight: 1.0,
            time,
            collision: None,
        }
    }

    pub fn at(mut self, position: [f64; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn energy(mut self, energy: f64) -> Self {
        self.energy = energy;
        self
    }

    pub fn collision(mut self, nuclide: i64, mt: i64) -> Self {
        self.collision = Some((nuclide, mt));
        self
    }
}

/// Writes PTRAC-shaped FORTRAN records for tests. Unless built with
/// [`PtracFixture::with_layout`], every line kind uses [`LONG_FIELDS`] long
/// and [`DOUBLE_FIELDS`] double values.
pub struct PtracFixture {
    bytes: Vec<u8>,
    value_width: ValueWidth,
    count_width: CountWidth,
    layout: FixtureLayout,
}

impl PtracFixture {
    pub fn new(title: &str) -> Self {
        Self::with_widths(title, ValueWidth::F64, CountWidth::I64)
    }

    pub fn with_widths(title: &str, value_width: ValueWidth, count_width: CountWidth) -> Self {
        Self::build(title, value_width, count_width, UNIFORM_LAYOUT)
    }

    /// Long groups need at least six slots and double groups nine.
    pub fn with_layout(title: &str, layout: FixtureLayout) -> Self {
        Self::build(title, ValueWidth::F64, CountWidth::I64, layout)
    }

    fn build(
        title: &str,
        value_width: ValueWidth,
        count_width: CountWidth,
        layout: FixtureLayout,
    ) -> Self {
        let mut fixture = Self {
            bytes: Vec::new(),
            value_width,
            count_width,
            layout,
        };
        fixture.record(b"-1".to_vec());
        fixture.record(b"mcnp    6.2     09/13/21".to_vec());
        fixture.record(title.as_bytes().to_vec());

        // one descriptor group holding one value
        let descriptors = fixture.values(&[1.0, 1.0, 4.0]);
        fixture.record(descriptors);

        let mut layout = 2_i32.to_le_bytes().to_vec();
        for (long, double) in fixture.layout {
            layout.extend(fixture.count(long as i64));
            layout.extend(fixture.count(double as i64));
        }
        fixture.record(layout);

        let mut ids = fixture.count(1);
        ids.extend(fixture.count(2));
        fixture.record(ids);
        fixture
    }

    pub fn history(mut self, nps: i64, events: &[FixtureEvent]) -> Self {
        let first = events.first().map_or(END_OF_HISTORY, |event| event.code);
        let mut nps_line = self.count(nps);
        nps_line.extend(self.count(first));
        self.record(nps_line);

        for (index, event) in events.iter().enumerate() {
            let next = events
                .get(index + 1)
                .map_or(END_OF_HISTORY, |next| next.code);
            let (long_fields, double_fields) = self.layout[line_kind_index(event.code)];
            let mut long = vec![0.0; long_fields];
            long[0] = next as f64;
            long[5] = event.cell as f64;
            if let Some((nuclide, mt)) = event.collision {
                long[2] = nuclide as f64;
                long[3] = mt as f64;
            }
            let mut double = vec![0.0; double_fields];
            double[..3].copy_from_slice(&event.position);
            double[6] = event.energy;
            double[7] = event.weight;
            double[8] = event.time;
            let mut line = self.values(&long);
            line.extend(self.values(&double));
            self.record(line);
        }
        self
    }

    /// Appends bytes with no framing, for corruption tests.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, &self.bytes).expect("fixture should be written");
        path
    }

    fn record(&mut self, payload: Vec<u8>) {
        let len = payload.len() as i32;
        self.bytes.extend_from_slice(&len.to_le_bytes());
        self.bytes.extend_from_slice(&payload);
        self.bytes.extend_from_slice(&len.to_le_bytes());
    }

    fn values(&self, values: &[f64]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|value| match self.value_width {
                ValueWidth::F64 => value.to_le_bytes().to_vec(),
                ValueWidth::F32 => (*value as f32).to_le_bytes().to_vec(),
            })
            .collect()
    }

    fn count(&self, value: i64) -> Vec<u8> {
        match self.count_width {
            CountWidth::I64 => value.to_le_bytes().to_vec(),
            CountWidth::I32 => (value as i32).to_le_bytes().to_vec(),
        }
    }
}

/// Header slot for an event code; unrecognized codes use the bank line.
fn line_kind_index(code: i64) -> usize {
    match code {
        1000 => 0,
        3000 => 2,
        4000 => 3,
        5000 => 4,
        _ => 1,
    }
}
