use crate::domain::{NeutronHistory, PtracError, PtracResult, Reaction, Vertex};
use crate::format::ParentLookup;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    neutron: NeutronHistory,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Bit pattern of a vertex's time and position. `-0.0` folds onto `+0.0`
/// so the key agrees with `==`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    time: u64,
    position: [u64; 3],
}

impl VertexKey {
    fn of(vertex: &Vertex) -> Option<Self> {
        let bits = |value: f64| -> Option<u64> {
            if value.is_nan() {
                None
            } else if value == 0.0 {
                Some(0)
            } else {
                Some(value.to_bits())
            }
        };
        Some(Self {
            time: bits(vertex.time)?,
            position: [
                bits(vertex.position[0])?,
                bits(vertex.position[1])?,
                bits(vertex.position[2])?,
            ],
        })
    }
}

/// Rooted tree of neutron lifetimes for one NPS.
///
/// Node 0 is the virtual spontaneous-fission source. Nodes are never removed,
/// so a [`NodeId`] stays valid for the lifetime of the tree.
#[derive(Debug, Clone)]
pub struct FissionChainTree {
    nodes: Vec<Node>,
    lookup: ParentLookup,
    index: HashMap<VertexKey, Vec<NodeId>>,
}

impl FissionChainTree {
    pub fn new(root: NeutronHistory, lookup: ParentLookup) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            lookup,
            index: HashMap::new(),
        };
        tree.push_node(root, None);
        tree
    }

    pub fn root_id(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn root(&self) -> &NeutronHistory {
        &self.nodes[NodeId::ROOT.0].neutron
    }

    pub fn nps(&self) -> i64 {
        self.root().nps
    }

    /// Number of nodes, virtual root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing but the virtual root is present.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn get(&self, id: NodeId) -> Option<&NeutronHistory> {
        self.nodes.get(id.0).map(|node| &node.neutron)
    }

    pub fn neutron(&self, id: NodeId) -> &NeutronHistory {
        &self.nodes[id.0].neutron
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Neutrons emitted by the reaction that destroyed `id`.
    pub fn multiplicity(&self, id: NodeId) -> usize {
        self.nodes[id.0].children.len()
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.parent(parent);
        }
        depth
    }

    pub fn preorder(&self) -> Preorder<'_> {
        Preorder {
            tree: self,
            stack: vec![NodeId::ROOT],
        }
    }

    /// Links a completed neutron into the tree.
    ///
    /// A spontaneous-fission creation hangs off the root. Any other creation
    /// is matched, exactly, against the destruction time and position of the
    /// nodes already present; the first match in pre-order is the parent and
    /// supplies the creation reaction.
    pub fn insert(&mut self, nps: i64, creation: Vertex, destruction: Vertex) -> PtracResult<NodeId> {
        let mut creation = creation;
        let parent = if creation.reaction == Reaction::SpontaneousFission {
            NodeId::ROOT
        } else {
            let parent = self.find_parent(&creation).ok_or(PtracError::OrphanNeutron {
                nps,
                creation_time: creation.time,
                creation_position: creation.position,
            })?;
            creation.reaction = self.neutron(parent).destruction.reaction;
            parent
        };

        let neutron = NeutronHistory {
            nps,
            creation: Some(creation),
            destruction,
        };
        Ok(self.push_node(neutron, Some(parent)))
    }

    pub fn find_parent(&self, creation: &Vertex) -> Option<NodeId> {
        match self.lookup {
            ParentLookup::LinearScan => self
                .preorder()
                .find(|id| self.neutron(*id).destruction.coincides_with(creation)),
            ParentLookup::Indexed => {
                let candidates = self.index.get(&VertexKey::of(creation)?)?;
                match candidates.as_slice() {
                    [] => None,
                    [only] => Some(*only),
                    _ => self.preorder().find(|id| candidates.contains(id)),
                }
            }
        }
    }

    fn push_node(&mut self, neutron: NeutronHistory, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        if self.lookup == ParentLookup::Indexed
            && let Some(key) = VertexKey::of(&neutron.destruction)
        {
            self.index.entry(key).or_default().push(id);
        }
        self.nodes.push(Node {
            neutron,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }
}

/// Depth-first, parent-before-children traversal in insertion order.
pub struct Preorder<'a> {
    tree: &'a FissionChainTree,
    stack: Vec<NodeId>,
}

impl Iterator for Preorder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
