use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest element dimension supported by the mesh
pub const MAXIMUM_ELEMENT_XI_DIMENSIONS: usize = 3;

/// Serial number of the region that issued a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct RegionTag(pub(crate) u32);

/// Handle of a node in a region's mesh.
///
/// Handles remember the region that issued them, so a handle from another
/// region is never mistaken for a local one with the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub(crate) region: RegionTag,
    pub(crate) index: u32,
}

/// Handle of an element in a region's mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId {
    pub(crate) region: RegionTag,
    pub(crate) index: u32,
}

/// Handle of a field in a region's field graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldId {
    pub(crate) region: RegionTag,
    pub(crate) index: u32,
}

/// Identity of a cache, unique within its region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheId(pub(crate) u64);

impl NodeId {
    pub(crate) fn new(region: RegionTag, index: u32) -> Self {
        Self { region, index }
    }

    /// Identifier as seen by callers (1-based, like the mesh numbering)
    pub fn identifier(self) -> u32 {
        self.index + 1
    }
}

impl ElementId {
    pub(crate) fn new(region: RegionTag, index: u32) -> Self {
        Self { region, index }
    }

    pub fn identifier(self) -> u32 {
        self.index + 1
    }
}

impl FieldId {
    pub(crate) fn new(region: RegionTag, index: u32) -> Self {
        Self { region, index }
    }

    pub(crate) fn from_index(region: RegionTag, index: NodeIndex) -> Self {
        Self::new(region, index.index() as u32)
    }

    pub(crate) fn index(self) -> NodeIndex {
        NodeIndex::new(self.index as usize)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node #{}", self.identifier())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element #{}", self.identifier())
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field #{}", self.index)
    }
}

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache #{}", self.0)
    }
}

/// Element of a region's mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Handle of this element
    pub id: ElementId,

    /// Intrinsic dimension (1 = line, 2 = square, 3 = cube)
    pub dimension: usize,

    /// Local nodes in linear Lagrange order (xi1 varies fastest).
    /// Empty when the element carries no nodal interpolation.
    pub nodes: Vec<NodeId>,
}

impl Element {
    /// Number of local nodes a linear Lagrange element of `dimension` needs
    pub fn linear_node_count(dimension: usize) -> usize {
        1 << dimension
    }

    pub fn has_nodes(&self) -> bool {
        !self.nodes.is_empty()
    }
}
