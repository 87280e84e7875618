//! Energy deposition of a single particle track in a detector cell.

use crate::domain::ParticleHistory;
use crate::format::EventCodeTable;
use crate::serialization::{format_fixed_f64, format_fixed_i64};
use serde::Serialize;

pub const DEFAULT_DETECTOR_CELL: i64 = 601;

const COLUMN_WIDTH: usize = 12;
const TIME_WIDTH: usize = 24;
const PRECISION: usize = 6;

pub const PULSE_TABLE_HEADER: &str = "#    x1(cm)      y1(cm)      z1(cm)      x2(cm)      y2(cm)      z2(cm) energy(MeV)            time(shakes)         nps";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pulse {
    pub nps: i64,
    pub start_position: [f64; 3],
    pub end_position: [f64; 3],
    /// Midpoint of the deposition track.
    pub position: [f64; 3],
    pub time: f64,
    /// Deposited energy, MeV.
    pub energy: f64,
}

impl Pulse {
    /// Pulse left in `detector_cell` using the default terminal event code.
    pub fn from_particle(particle: &ParticleHistory, detector_cell: i64) -> Option<Self> {
        Self::from_particle_with_codes(particle, detector_cell, &EventCodeTable::default())
    }

    /// Sums the energy lost between each in-cell event and its successor.
    /// Terminal events and the last event of the track deposit nothing. The
    /// pulse starts at the first in-cell event that deposits energy.
    pub fn from_particle_with_codes(
        particle: &ParticleHistory,
        detector_cell: i64,
        codes: &EventCodeTable,
    ) -> Option<Self> {
        let mut pulse: Option<Pulse> = None;

        for pair in particle.events().windows(2) {
            let [event, next] = pair else { continue };
            if event.cell_id != detector_cell || event.event_code == codes.terminal {
                continue;
            }
            let pulse = pulse.get_or_insert(Pulse {
                nps: event.particle_id,
                start_position: event.position,
                end_position: event.position,
                position: event.position,
                time: event.time,
                energy: 0.0,
            });
            // the track starts where deposition starts
            if pulse.energy == 0.0 {
                pulse.nps = event.particle_id;
                pulse.start_position = event.position;
                pulse.time = event.time;
            }
            pulse.end_position = next.position;
            pulse.energy += event.energy - next.energy;
        }

        let mut pulse = pulse.filter(|pulse| pulse.energy > 0.0)?;
        for axis in 0..3 {
            pulse.position[axis] = (pulse.start_position[axis] + pulse.end_position[axis]) * 0.5;
        }
        Some(pulse)
    }

    pub fn format_line(&self) -> String {
        let mut line = String::new();
        for value in self.start_position.iter().chain(&self.end_position) {
            line.push_str(&format_fixed_f64(*value, COLUMN_WIDTH, PRECISION));
        }
        line.push_str(&format_fixed_f64(self.energy, COLUMN_WIDTH, PRECISION));
        line.push_str(&format_fixed_f64(self.time, TIME_WIDTH, PRECISION));
        line.push_str(&format_fixed_i64(self.nps, COLUMN_WIDTH));
        line
    }
}

/// Header plus one row per pulse.
pub fn render_pulse_table(pulses: &[Pulse]) -> String {
    let mut table = String::from(PULSE_TABLE_HEADER);
    table.push('\n');
    for pulse in pulses {
        table.push_str(&pulse.format_line());
        table.push('\n');
    }
    table
}
