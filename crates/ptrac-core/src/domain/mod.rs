pub mod errors;

pub use errors::{ExitStatus, FormatConfigError, PtracError, PtracErrorKind, PtracResult};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionData {
    /// ZZAAA identifier of the struck nuclide.
    pub nuclide: i64,
    /// ENDF MT number of the sampled reaction.
    pub reaction: i64,
}

/// One decoded PTRAC data line, tagged with the code of the event it describes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub particle_id: i64,
    pub event_code: i64,
    pub cell_id: i64,
    pub position: [f64; 3],
    pub energy: f64,
    pub weight: f64,
    pub time: f64,
    pub collision: Option<CollisionData>,
}

/// Events of one tracked particle, from its creation to its terminal event.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParticleHistory {
    events: Vec<Event>,
}

impl ParticleHistory {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.events.push(event);
    }
}

impl<'a> IntoIterator for &'a ParticleHistory {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Every particle spawned by one primary source history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NpsHistory {
    pub nps: i64,
    particles: Vec<ParticleHistory>,
}

impl NpsHistory {
    pub fn new(nps: i64, particles: Vec<ParticleHistory>) -> Self {
        Self { nps, particles }
    }

    pub fn particles(&self) -> &[ParticleHistory] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.particles.iter().map(ParticleHistory::len).sum()
    }

    /// All events in decode order.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.particles.iter().flat_map(ParticleHistory::iter)
    }
}

/// Reaction that creates or destroys a neutron in a fission chain.
///
/// Numeric codes are the ones downstream histogramming expects; `Escape`
/// covers every non-multiplying termination that is not a tabulated capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reaction {
    #[serde(rename = "IF")]
    InducedFission,
    #[serde(rename = "SF")]
    SpontaneousFission,
    #[serde(rename = "N2N")]
    N2n,
    #[serde(rename = "B10_CAPTURE")]
    B10Capture,
    #[serde(rename = "H1_CAPTURE")]
    H1Capture,
    #[serde(rename = "CF252_CAPTURE")]
    Cf252Capture,
    #[serde(rename = "N3N")]
    N3n,
    #[serde(rename = "N4N")]
    N4n,
    #[serde(rename = "ESCAPE")]
    Escape,
}

impl Reaction {
    pub const fn code(self) -> i32 {
        match self {
            Self::InducedFission => 0,
            Self::SpontaneousFission => 1,
            Self::N2n => 2,
            Self::B10Capture => 3,
            Self::H1Capture => 4,
            Self::Cf252Capture => 5,
            Self::N3n => 6,
            Self::N4n => 7,
            Self::Escape => -1,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::InducedFission),
            1 => Some(Self::SpontaneousFission),
            2 => Some(Self::N2n),
            3 => Some(Self::B10Capture),
            4 => Some(Self::H1Capture),
            5 => Some(Self::Cf252Capture),
            6 => Some(Self::N3n),
            7 => Some(Self::N4n),
            -1 => Some(Self::Escape),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InducedFission => "IF",
            Self::SpontaneousFission => "SF",
            Self::N2n => "N2N",
            Self::B10Capture => "B10_CAPTURE",
            Self::H1Capture => "H1_CAPTURE",
            Self::Cf252Capture => "CF252_CAPTURE",
            Self::N3n => "N3N",
            Self::N4n => "N4N",
            Self::Escape => "ESCAPE",
        }
    }

    /// Reactions that end a neutron and emit one or more new ones.
    pub const fn is_multiplying(self) -> bool {
        matches!(
            self,
            Self::InducedFission | Self::SpontaneousFission | Self::N2n | Self::N3n | Self::N4n
        )
    }

    pub const fn is_capture(self) -> bool {
        matches!(self, Self::B10Capture | Self::H1Capture | Self::Cf252Capture)
    }
}

impl Display for Reaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// Where, when and through which reaction a neutron was created or destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vertex {
    pub reaction: Reaction,
    pub position: [f64; 3],
    pub energy: f64,
    pub time: f64,
}

impl Vertex {
    pub fn at_event(reaction: Reaction, event: &Event) -> Self {
        Self {
            reaction,
            position: event.position,
            energy: event.energy,
            time: event.time,
        }
    }

    /// Exact floating-point coincidence of time and position.
    pub fn coincides_with(&self, other: &Vertex) -> bool {
        self.time == other.time && self.position == other.position
    }
}

/// One neutron lifetime. The virtual spontaneous-fission root has no creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NeutronHistory {
    pub nps: i64,
    pub creation: Option<Vertex>,
    pub destruction: Vertex,
}

impl NeutronHistory {
    pub fn spontaneous_fission_source(nps: i64, position: [f64; 3], time: f64) -> Self {
        Self {
            nps,
            creation: None,
            destruction: Vertex {
                reaction: Reaction::SpontaneousFission,
                position,
                energy: 0.0,
                time,
            },
        }
    }

    pub fn survival_time(&self) -> Option<f64> {
        self.creation
            .map(|creation| self.destruction.time - creation.time)
    }
}
