use super::tree::FissionChainTree;
use crate::domain::Reaction;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionData {
    pub reaction_type: Reaction,
    pub reaction_time: f64,
    pub children_multiplicity: usize,
    /// Creation energy; the virtual root has none.
    pub initial_energy: Option<f64>,
}

/// Flat per-node sequences gathered from one or more fission-chain trees.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FissionChainData {
    pub reaction_data: Vec<ReactionData>,
    pub survival_times: Vec<f64>,
    pub sf_event_times: Vec<f64>,
}

impl FissionChainData {
    pub fn from_tree(tree: &FissionChainTree) -> Self {
        let mut data = Self::default();
        data.absorb(tree);
        data
    }

    /// Appends one tree in pre-order. A root without children means the
    /// source emitted no neutrons, and nothing is recorded.
    pub fn absorb(&mut self, tree: &FissionChainTree) {
        if tree.is_empty() {
            return;
        }

        for id in tree.preorder() {
            let neutron = tree.neutron(id);
            self.reaction_data.push(ReactionData {
                reaction_type: neutron.destruction.reaction,
                reaction_time: neutron.destruction.time,
                children_multiplicity: tree.multiplicity(id),
                initial_energy: neutron.creation.map(|creation| creation.energy),
            });
            match neutron.survival_time() {
                Some(survival) => self.survival_times.push(survival),
                None => self.sf_event_times.push(neutron.destruction.time),
            }
        }
    }

    pub fn merge(&mut self, other: FissionChainData) {
        self.reaction_data.extend(other.reaction_data);
        self.survival_times.extend(other.survival_times);
        self.sf_event_times.extend(other.sf_event_times);
    }

    pub fn is_empty(&self) -> bool {
        self.reaction_data.is_empty()
    }

    /// Multiplicity tally over the nodes destroyed by `reaction`.
    pub fn multiplicity_counts(&self, reaction: Reaction) -> BTreeMap<usize, u64> {
        let mut counts = BTreeMap::new();
        for record in self
            .reaction_data
            .iter()
            .filter(|record| record.reaction_type == reaction)
        {
            *counts.entry(record.children_multiplicity).or_insert(0) += 1;
        }
        counts
    }

    /// Number of nodes per destruction reaction.
    pub fn reaction_counts(&self) -> BTreeMap<Reaction, u64> {
        let mut counts = BTreeMap::new();
        for record in &self.reaction_data {
            *counts.entry(record.reaction_type).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::FissionChainData;
    use crate::chain::FissionChainTree;
    use crate::domain::{NeutronHistory, Reaction, Vertex};
    use crate::format::ParentLookup;

    fn vertex(reaction: Reaction, time: f64, energy: f64) -> Vertex {
        Vertex {
            reaction,
            position: [time, 0.0, 0.0],
            energy,
            time,
        }
    }

    #[test]
    fn flattening_follows_preorder_and_splits_root_from_survivals() {
        let root = NeutronHistory::spontaneous_fission_source(2, [0.0; 3], 0.0);
        let mut tree = FissionChainTree::new(root, ParentLookup::LinearScan);
        let sf = Vertex {
            reaction: Reaction::SpontaneousFission,
            position: [0.0; 3],
            energy: 2.1,
            time: 0.0,
        };
        tree.insert(2, sf, vertex(Reaction::InducedFission, 3.0, 0.5))
            .expect("SF child");
        tree.insert(2, sf, vertex(Reaction::Escape, 1.0, 0.1))
            .expect("SF child");
        tree.insert(2, vertex(Reaction::Escape, 3.0, 1.7), vertex(Reaction::B10Capture, 4.5, 0.0))
            .expect("child of the fission");

        let data = FissionChainData::from_tree(&tree);
        let reactions: Vec<Reaction> = data
            .reaction_data
            .iter()
            .map(|record| record.reaction_type)
            .collect();
        assert_eq!(
            reactions,
            vec![
                Reaction::SpontaneousFission,
                Reaction::InducedFission,
                Reaction::B10Capture,
                Reaction::Escape
            ]
        );
        assert_eq!(data.reaction_data[0].children_multiplicity, 2);
        assert_eq!(data.reaction_data[0].initial_energy, None);
        assert_eq!(data.reaction_data[1].initial_energy, Some(2.1));
        assert_eq!(data.reaction_data[2].initial_energy, Some(1.7));
        assert_eq!(data.survival_times, vec![3.0, 1.5, 1.0]);
        assert_eq!(data.sf_event_times, vec![0.0]);

        let fission_counts = data.multiplicity_counts(Reaction::InducedFission);
        assert_eq!(fission_counts.get(&1), Some(&1));
        assert_eq!(data.reaction_counts().get(&Reaction::Escape), Some(&1));
    }

    #[test]
    fn childless_root_contributes_nothing() {
        let root = NeutronHistory::spontaneous_fission_source(9, [1.0; 3], 7.0);
        let tree = FissionChainTree::new(root, ParentLookup::LinearScan);
        let data = FissionChainData::from_tree(&tree);
        assert!(data.is_empty());
        assert!(data.sf_event_times.is_empty());
    }

    #[test]
    fn merge_concatenates_in_order() {
        let mut first = FissionChainData {
            survival_times: vec![1.0],
            ..FissionChainData::default()
        };
        let second = FissionChainData {
            survival_times: vec![2.0],
            sf_event_times: vec![5.0],
            ..FissionChainData::default()
        };
        first.merge(second);
        assert_eq!(first.survival_times, vec![1.0, 2.0]);
        assert_eq!(first.sf_event_times, vec![5.0]);
    }
}
