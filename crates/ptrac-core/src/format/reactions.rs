use crate::domain::{CollisionData, Reaction};
use serde::{Deserialize, Serialize};

pub const HYDROGEN_1: i64 = 1001;
pub const BORON_10: i64 = 5010;
pub const CALIFORNIUM_252: i64 = 98252;

const MT_N2N: i64 = 16;
const MT_N3N: i64 = 17;
const MT_FISSION: i64 = 18;
const MT_N4N: i64 = 37;
const MT_N_GAMMA: i64 = 102;
const MT_N_ALPHA: i64 = 107;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionEntry {
    pub nuclide: i64,
    pub mt: i64,
    pub reaction: Reaction,
}

/// What a collision does to the fission chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    Reaction(Reaction),
    /// Any untabulated pair on an expected nuclide.
    Scatter,
    /// Untabulated pair on a nuclide outside `expected_nuclides`.
    UnexpectedNuclide,
}

/// `(nuclide, MT)` pairs that end a neutron in a fission chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionTable {
    pub entries: Vec<ReactionEntry>,
    /// Empty disables the nuclide sanity check.
    pub expected_nuclides: Vec<i64>,
}

impl Default for ReactionTable {
    fn default() -> Self {
        let entry = |nuclide, mt, reaction| ReactionEntry {
            nuclide,
            mt,
            reaction,
        };
        Self {
            entries: vec![
                entry(CALIFORNIUM_252, MT_FISSION, Reaction::InducedFission),
                entry(CALIFORNIUM_252, MT_N2N, Reaction::N2n),
                entry(CALIFORNIUM_252, MT_N3N, Reaction::N3n),
                entry(CALIFORNIUM_252, MT_N4N, Reaction::N4n),
                entry(CALIFORNIUM_252, MT_N_GAMMA, Reaction::Cf252Capture),
                entry(HYDROGEN_1, MT_N_GAMMA, Reaction::H1Capture),
                entry(BORON_10, MT_N_ALPHA, Reaction::B10Capture),
            ],
            expected_nuclides: Vec::new(),
        }
    }
}

impl ReactionTable {
    pub fn lookup(&self, nuclide: i64, mt: i64) -> Option<Reaction> {
        self.entries
            .iter()
            .find(|entry| entry.nuclide == nuclide && entry.mt == mt)
            .map(|entry| entry.reaction)
    }

    pub fn classify(&self, collision: CollisionData) -> CollisionOutcome {
        if let Some(reaction) = self.lookup(collision.nuclide, collision.reaction) {
            return CollisionOutcome::Reaction(reaction);
        }
        if self.expected_nuclides.is_empty()
            || self.expected_nuclides.contains(&collision.nuclide)
        {
            CollisionOutcome::Scatter
        } else {
            CollisionOutcome::UnexpectedNuclide
        }
    }
}
